//! History listing handlers
//!
//! Each listing route exists with and without a trailing `{offset}` segment;
//! both map to the same handler, and a missing offset means `0`.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::dto::{
    AgentPath, CounterPath, HistoryEntryDto, HistoryPageDto, HistoryQuery, JobPath, LatestPath,
    PageNumberDto, PageQuery, PipelinePath, PipelineRunDto, StagePagePath, StagePath,
};
use crate::application::{HistoryPage, HistoryService};
use crate::domain::{DomainError, HistoryScope, RequestContext, SortOrder};
use crate::interfaces::http::common::{ApiError, ValidatedPath, ValidatedQuery};
use crate::interfaces::http::dto::ApiResponse;
use crate::interfaces::http::modules::metrics::record_history_page;

#[derive(Clone)]
pub struct HistoryAppState {
    pub service: Arc<HistoryService>,
}

fn parse_order(order: Option<&str>) -> Result<SortOrder, ApiError> {
    match order {
        None => Ok(SortOrder::default()),
        Some(raw) => SortOrder::from_param(raw).ok_or_else(|| {
            ApiError(DomainError::InvalidArgument(format!(
                "order must be 'asc' or 'desc', got '{}'",
                raw
            )))
        }),
    }
}

fn configured_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn render(scope: &HistoryScope, page: HistoryPage) -> Json<HistoryPageDto> {
    record_history_page(scope.kind(), page.records.len());
    Json(HistoryPageDto::from_domain(page))
}

async fn list(
    state: &HistoryAppState,
    ctx: &RequestContext,
    scope: HistoryScope,
    offset: Option<i64>,
    order: Option<&str>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let order = parse_order(order)?;
    let page = state
        .service
        .load(ctx, &scope, offset.unwrap_or(0), order)
        .await?;
    Ok(render(&scope, page))
}

#[utoipa::path(
    get,
    path = "/api/pipelines/{pipeline_name}/history/{offset}",
    tag = "History",
    params(
        ("pipeline_name" = String, Path, description = "Pipeline name"),
        ("offset" = i64, Path, description = "Index of the first run; the segment may be omitted for 0"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Page of pipeline runs", body = HistoryPageDto),
        (status = 400, description = "Invalid order or offset", body = ApiResponse<String>),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Unknown pipeline", body = ApiResponse<String>),
        (status = 422, description = "Invalid pipeline name", body = ApiResponse<String>)
    )
)]
pub async fn pipeline_history(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<PipelinePath>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let scope = HistoryScope::pipeline(path.pipeline_name);
    list(&state, &ctx, scope, path.offset, query.order.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/api/stages/{pipeline_name}/{stage_name}/history/{offset}",
    tag = "History",
    params(
        ("pipeline_name" = String, Path, description = "Pipeline name"),
        ("stage_name" = String, Path, description = "Stage name"),
        ("offset" = i64, Path, description = "Index of the first stage run; the segment may be omitted for 0"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Page of stage runs", body = HistoryPageDto),
        (status = 400, description = "Invalid order or offset", body = ApiResponse<String>),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Unknown pipeline", body = ApiResponse<String>)
    )
)]
pub async fn stage_history(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<StagePath>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let scope = HistoryScope::stage(path.pipeline_name, path.stage_name);
    list(&state, &ctx, scope, path.offset, query.order.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/api/jobs/{pipeline_name}/{stage_name}/{job_name}/history/{offset}",
    tag = "History",
    params(
        ("pipeline_name" = String, Path, description = "Pipeline name"),
        ("stage_name" = String, Path, description = "Stage name"),
        ("job_name" = String, Path, description = "Job name"),
        ("offset" = i64, Path, description = "Index of the first job run; the segment may be omitted for 0"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Page of job runs", body = HistoryPageDto),
        (status = 400, description = "Invalid order or offset", body = ApiResponse<String>),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Unknown pipeline", body = ApiResponse<String>)
    )
)]
pub async fn job_history(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<JobPath>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let scope = HistoryScope::job(path.pipeline_name, path.stage_name, path.job_name);
    list(&state, &ctx, scope, path.offset, query.order.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/api/agents/{uuid}/job_run_history/{offset}",
    tag = "History",
    params(
        ("uuid" = String, Path, description = "Agent UUID"),
        ("offset" = i64, Path, description = "Index of the first job run; the segment may be omitted for 0"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Page of job runs executed by the agent", body = HistoryPageDto),
        (status = 400, description = "Invalid order or offset", body = ApiResponse<String>)
    )
)]
pub async fn agent_job_history(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<AgentPath>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let scope = HistoryScope::agent_jobs(path.uuid);
    list(&state, &ctx, scope, path.offset, query.order.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/api/stages/{pipeline_name}/{stage_name}/pages/{page_number}",
    tag = "History",
    params(
        ("pipeline_name" = String, Path, description = "Pipeline name"),
        ("stage_name" = String, Path, description = "Stage name"),
        ("page_number" = i64, Path, description = "One-based page number, clamped to the last page"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Page of stage runs", body = HistoryPageDto),
        (status = 400, description = "Invalid page size or order", body = ApiResponse<String>),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Unknown pipeline", body = ApiResponse<String>)
    )
)]
pub async fn stage_history_page(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<StagePagePath>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<HistoryPageDto>, ApiError> {
    let order = parse_order(query.order.as_deref())?;
    let page_size = query
        .page_size
        .unwrap_or_else(|| configured_size(state.service.settings().stage_page_size));
    let scope = HistoryScope::stage(path.pipeline_name, path.stage_name);

    let page = state
        .service
        .load_page_number(&ctx, &scope, path.page_number, page_size, order)
        .await?;
    Ok(render(&scope, page))
}

#[utoipa::path(
    get,
    path = "/api/pipelines/{pipeline_name}/page_for/{counter}",
    tag = "History",
    params(
        ("pipeline_name" = String, Path, description = "Pipeline name"),
        ("counter" = u64, Path, description = "Pipeline run counter"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Page number of the run in the newest-first listing", body = PageNumberDto),
        (status = 400, description = "Invalid counter or page size", body = ApiResponse<String>),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Pipeline has no runs", body = ApiResponse<String>)
    )
)]
pub async fn pipeline_page_for_counter(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<CounterPath>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<PageNumberDto>, ApiError> {
    let page_size = query
        .page_size
        .unwrap_or_else(|| configured_size(state.service.settings().pipeline_page_size));

    let page_number = state
        .service
        .page_number_for_counter(&ctx, &path.pipeline_name, path.counter, page_size)
        .await?;

    Ok(Json(PageNumberDto {
        pipeline_name: path.pipeline_name,
        counter: path.counter,
        page_size,
        page_number,
    }))
}

#[utoipa::path(
    get,
    path = "/api/pipelines/{pipeline_name}/latest",
    tag = "History",
    params(("pipeline_name" = String, Path, description = "Pipeline name")),
    responses(
        (status = 200, description = "Newest run of the pipeline", body = PipelineRunDto),
        (status = 403, description = "Caller may not view the pipeline", body = ApiResponse<String>),
        (status = 404, description = "Unknown pipeline or no runs yet", body = ApiResponse<String>)
    )
)]
pub async fn latest_pipeline_run(
    State(state): State<HistoryAppState>,
    ctx: RequestContext,
    ValidatedPath(path): ValidatedPath<LatestPath>,
) -> Result<Json<HistoryEntryDto>, ApiError> {
    let scope = HistoryScope::pipeline(&path.pipeline_name);
    let record = state
        .service
        .latest(&ctx, &scope)
        .await?
        .ok_or_else(|| DomainError::not_found("PipelineRun", "pipeline", path.pipeline_name))?;
    Ok(Json(HistoryEntryDto::from_domain(record)))
}
