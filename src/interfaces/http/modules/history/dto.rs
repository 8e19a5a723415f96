//! History listing DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::HistoryPage;
use crate::domain::{HistoryRecord, JobRun, PipelineRun, StageRun};
use crate::interfaces::http::dto::{PageLinkDto, PaginationDto};
use crate::shared::validate_name;

// ── Path parameters ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PipelinePath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StagePath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
    #[validate(custom(function = "validate_name"))]
    pub stage_name: String,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StagePagePath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
    #[validate(custom(function = "validate_name"))]
    pub stage_name: String,
    pub page_number: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JobPath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
    #[validate(custom(function = "validate_name"))]
    pub stage_name: String,
    #[validate(custom(function = "validate_name"))]
    pub job_name: String,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AgentPath {
    #[validate(length(min = 1, max = 255))]
    pub uuid: String,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CounterPath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
    pub counter: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LatestPath {
    #[validate(custom(function = "validate_name"))]
    pub pipeline_name: String,
}

// ── Query parameters ───────────────────────────────────────────

/// Ordering of a listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// `desc` (newest first, default) or `asc`
    pub order: Option<String>,
}

/// Ordering and page size of a page-number listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// `desc` (newest first, default) or `asc`
    pub order: Option<String>,
    /// Records per page; defaults to the listing's configured size
    pub page_size: Option<i64>,
}

// ── Responses ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct JobRunDto {
    pub pipeline_name: String,
    pub pipeline_counter: u64,
    pub stage_name: String,
    pub stage_counter: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_uuid: Option<String>,
    pub result: String,
    pub scheduled_at: DateTime<Utc>,
}

impl JobRunDto {
    fn from_domain(
        pipeline_name: String,
        pipeline_counter: u64,
        stage_name: String,
        stage_counter: u32,
        job: JobRun,
    ) -> Self {
        Self {
            pipeline_name,
            pipeline_counter,
            stage_name,
            stage_counter,
            name: job.name,
            agent_uuid: job.agent_uuid,
            result: job.result.as_str().to_string(),
            scheduled_at: job.scheduled_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StageRunDto {
    pub pipeline_name: String,
    pub pipeline_counter: u64,
    pub name: String,
    pub counter: u32,
    pub result: String,
    pub scheduled_at: DateTime<Utc>,
    pub jobs: Vec<JobRunDto>,
}

impl StageRunDto {
    fn from_domain(pipeline_name: String, pipeline_counter: u64, stage: StageRun) -> Self {
        let jobs = stage
            .jobs
            .into_iter()
            .map(|job| {
                JobRunDto::from_domain(
                    pipeline_name.clone(),
                    pipeline_counter,
                    stage.name.clone(),
                    stage.counter,
                    job,
                )
            })
            .collect();
        Self {
            pipeline_name,
            pipeline_counter,
            name: stage.name,
            counter: stage.counter,
            result: stage.result.as_str().to_string(),
            scheduled_at: stage.scheduled_at,
            jobs,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PipelineRunDto {
    pub name: String,
    pub counter: u64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    pub result: String,
    pub scheduled_at: DateTime<Utc>,
    pub stages: Vec<StageRunDto>,
}

impl PipelineRunDto {
    fn from_domain(run: PipelineRun) -> Self {
        let label = run.display_label();
        let result = run.result().as_str().to_string();
        let stages = run
            .stages
            .into_iter()
            .map(|stage| StageRunDto::from_domain(run.name.clone(), run.counter, stage))
            .collect();
        Self {
            name: run.name,
            counter: run.counter,
            label,
            triggered_by: run.triggered_by,
            result,
            scheduled_at: run.scheduled_at,
            stages,
        }
    }
}

/// One row of a history listing
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum HistoryEntryDto {
    Pipeline(PipelineRunDto),
    Stage(StageRunDto),
    Job(JobRunDto),
}

impl HistoryEntryDto {
    pub fn from_domain(record: HistoryRecord) -> Self {
        match record {
            HistoryRecord::Pipeline(run) => Self::Pipeline(PipelineRunDto::from_domain(run)),
            HistoryRecord::Stage {
                pipeline_name,
                pipeline_counter,
                stage,
            } => Self::Stage(StageRunDto::from_domain(
                pipeline_name,
                pipeline_counter,
                stage,
            )),
            HistoryRecord::Job {
                pipeline_name,
                pipeline_counter,
                stage_name,
                stage_counter,
                job,
            } => Self::Job(JobRunDto::from_domain(
                pipeline_name,
                pipeline_counter,
                stage_name,
                stage_counter,
                job,
            )),
        }
    }
}

/// A page of history plus its window and navigation strip
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPageDto {
    pub pagination: PaginationDto,
    pub pages: Vec<PageLinkDto>,
    pub history: Vec<HistoryEntryDto>,
}

impl HistoryPageDto {
    pub fn from_domain(page: HistoryPage) -> Self {
        Self {
            pagination: PaginationDto::from(&page.pagination),
            pages: page
                .pagination
                .page_links()
                .into_iter()
                .map(PageLinkDto::from)
                .collect(),
            history: page
                .records
                .into_iter()
                .map(HistoryEntryDto::from_domain)
                .collect(),
        }
    }
}

/// Page on which a pipeline run appears
#[derive(Debug, Serialize, ToSchema)]
pub struct PageNumberDto {
    pub pipeline_name: String,
    pub counter: u64,
    pub page_size: i64,
    pub page_number: u64,
}
