//! Run history entities

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a pipeline, stage or job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunResult {
    Passed,
    Failed,
    Cancelled,
    /// Still running or never reported
    #[default]
    Unknown,
}

impl RunResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        }
    }
}

/// A single job execution inside a stage run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub name: String,
    /// Agent the job was assigned to, if it got that far
    #[serde(default)]
    pub agent_uuid: Option<String>,
    #[serde(default)]
    pub result: RunResult,
    pub scheduled_at: DateTime<Utc>,
}

impl JobRun {
    pub fn new(name: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            agent_uuid: None,
            result: RunResult::Unknown,
            scheduled_at,
        }
    }

    pub fn on_agent(mut self, agent_uuid: impl Into<String>) -> Self {
        self.agent_uuid = Some(agent_uuid.into());
        self
    }

    pub fn with_result(mut self, result: RunResult) -> Self {
        self.result = result;
        self
    }
}

/// A stage execution inside a pipeline run. Re-runs of the same stage in the
/// same pipeline run get increasing `counter` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRun {
    pub name: String,
    #[serde(default = "first_counter")]
    pub counter: u32,
    #[serde(default)]
    pub result: RunResult,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub jobs: Vec<JobRun>,
}

fn first_counter() -> u32 {
    1
}

impl StageRun {
    pub fn new(name: impl Into<String>, counter: u32, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            counter,
            result: RunResult::Unknown,
            scheduled_at,
            jobs: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: RunResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_job(mut self, job: JobRun) -> Self {
        self.jobs.push(job);
        self
    }
}

/// One run of a pipeline, identified by its monotonically increasing counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub name: String,
    pub counter: u64,
    /// Display label; falls back to the counter when empty
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub triggered_by: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub stages: Vec<StageRun>,
}

impl PipelineRun {
    pub fn new(name: impl Into<String>, counter: u64, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            counter,
            label: counter.to_string(),
            triggered_by: None,
            scheduled_at,
            stages: Vec::new(),
        }
    }

    pub fn triggered_by(mut self, user: impl Into<String>) -> Self {
        self.triggered_by = Some(user.into());
        self
    }

    pub fn with_stage(mut self, stage: StageRun) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            self.counter.to_string()
        } else {
            self.label.clone()
        }
    }

    /// Failed if any stage failed, Cancelled if any was cancelled, Passed
    /// once every stage passed.
    pub fn result(&self) -> RunResult {
        let results = self.stages.iter().map(|s| s.result);
        if results.clone().any(|r| r == RunResult::Failed) {
            RunResult::Failed
        } else if results.clone().any(|r| r == RunResult::Cancelled) {
            RunResult::Cancelled
        } else if !self.stages.is_empty() && results.clone().all(|r| r == RunResult::Passed) {
            RunResult::Passed
        } else {
            RunResult::Unknown
        }
    }
}

/// What a history listing is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HistoryScope {
    Pipeline {
        pipeline: String,
    },
    Stage {
        pipeline: String,
        stage: String,
    },
    Job {
        pipeline: String,
        stage: String,
        job: String,
    },
    /// Every job run an agent has executed
    AgentJobs {
        agent_uuid: String,
    },
}

/// Listing kind, used to pick the page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    Pipeline,
    Stage,
    Job,
    AgentJobs,
}

impl HistoryScope {
    pub fn pipeline(pipeline: impl Into<String>) -> Self {
        Self::Pipeline {
            pipeline: pipeline.into(),
        }
    }

    pub fn stage(pipeline: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::Stage {
            pipeline: pipeline.into(),
            stage: stage.into(),
        }
    }

    pub fn job(
        pipeline: impl Into<String>,
        stage: impl Into<String>,
        job: impl Into<String>,
    ) -> Self {
        Self::Job {
            pipeline: pipeline.into(),
            stage: stage.into(),
            job: job.into(),
        }
    }

    pub fn agent_jobs(agent_uuid: impl Into<String>) -> Self {
        Self::AgentJobs {
            agent_uuid: agent_uuid.into(),
        }
    }

    pub fn kind(&self) -> HistoryKind {
        match self {
            Self::Pipeline { .. } => HistoryKind::Pipeline,
            Self::Stage { .. } => HistoryKind::Stage,
            Self::Job { .. } => HistoryKind::Job,
            Self::AgentJobs { .. } => HistoryKind::AgentJobs,
        }
    }
}

impl fmt::Display for HistoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline { pipeline } => write!(f, "pipeline {}", pipeline),
            Self::Stage { pipeline, stage } => write!(f, "stage {}/{}", pipeline, stage),
            Self::Job {
                pipeline,
                stage,
                job,
            } => write!(f, "job {}/{}/{}", pipeline, stage, job),
            Self::AgentJobs { agent_uuid } => write!(f, "agent {}", agent_uuid),
        }
    }
}

/// Ordering of a history listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest run first
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    /// Parses the `order` query parameter (`asc` / `desc`).
    pub fn from_param(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// One row of a history listing
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    Pipeline(PipelineRun),
    Stage {
        pipeline_name: String,
        pipeline_counter: u64,
        stage: StageRun,
    },
    Job {
        pipeline_name: String,
        pipeline_counter: u64,
        stage_name: String,
        stage_counter: u32,
        job: JobRun,
    },
}

impl HistoryRecord {
    /// Key that orders records oldest first.
    pub fn sort_key(&self) -> (u64, u32, DateTime<Utc>) {
        match self {
            Self::Pipeline(run) => (run.counter, 0, run.scheduled_at),
            Self::Stage {
                pipeline_counter,
                stage,
                ..
            } => (*pipeline_counter, stage.counter, stage.scheduled_at),
            Self::Job {
                pipeline_counter,
                stage_counter,
                job,
                ..
            } => (*pipeline_counter, *stage_counter, job.scheduled_at),
        }
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        match self {
            Self::Pipeline(run) => run.scheduled_at,
            Self::Stage { stage, .. } => stage.scheduled_at,
            Self::Job { job, .. } => job.scheduled_at,
        }
    }

    pub fn pipeline_name(&self) -> &str {
        match self {
            Self::Pipeline(run) => &run.name,
            Self::Stage { pipeline_name, .. } | Self::Job { pipeline_name, .. } => pipeline_name,
        }
    }
}
