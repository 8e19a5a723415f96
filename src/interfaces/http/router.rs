//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::FromRef, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{ApiResponse, PageLinkDto, PaginationDto};
use super::modules::health::{self, HealthResponse, HealthState};
use super::modules::history::dto::{
    HistoryEntryDto, HistoryPageDto, JobRunDto, PageNumberDto, PipelineRunDto, StageRunDto,
};
use super::modules::history::{self, HistoryAppState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use crate::application::HistoryService;
use crate::infrastructure::storage::InMemoryHistoryStore;

/// Router state; each handler pulls its own slice via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub history: HistoryAppState,
    pub health: HealthState,
    pub metrics: MetricsState,
}

impl FromRef<ApiState> for HistoryAppState {
    fn from_ref(s: &ApiState) -> Self {
        s.history.clone()
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        s.health.clone()
    }
}

impl FromRef<ApiState> for MetricsState {
    fn from_ref(s: &ApiState) -> Self {
        s.metrics.clone()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        history::pipeline_history,
        history::stage_history,
        history::job_history,
        history::agent_job_history,
        history::stage_history_page,
        history::pipeline_page_for_counter,
        history::latest_pipeline_run,
    ),
    components(schemas(
        ApiResponse<String>,
        PaginationDto,
        PageLinkDto,
        HistoryPageDto,
        HistoryEntryDto,
        PipelineRunDto,
        StageRunDto,
        JobRunDto,
        PageNumberDto,
        HealthResponse,
    )),
    tags(
        (name = "History", description = "Paginated pipeline, stage, job and agent run history"),
        (name = "Health", description = "Service liveness")
    ),
    info(
        title = "Run History API",
        version = "1.0.0",
        description = "Paginated run history of a CI/CD server"
    )
)]
pub struct ApiDoc;

pub fn create_api_router(
    service: Arc<HistoryService>,
    store: Arc<InMemoryHistoryStore>,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let state = ApiState {
        history: HistoryAppState { service },
        health: HealthState {
            store,
            started_at: Arc::new(Instant::now()),
        },
        metrics: MetricsState {
            handle: prometheus_handle,
        },
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let history_routes = Router::new()
        .route("/pipelines/{pipeline_name}/history", get(history::pipeline_history))
        .route(
            "/pipelines/{pipeline_name}/history/{offset}",
            get(history::pipeline_history),
        )
        .route(
            "/pipelines/{pipeline_name}/page_for/{counter}",
            get(history::pipeline_page_for_counter),
        )
        .route(
            "/pipelines/{pipeline_name}/latest",
            get(history::latest_pipeline_run),
        )
        .route(
            "/stages/{pipeline_name}/{stage_name}/history",
            get(history::stage_history),
        )
        .route(
            "/stages/{pipeline_name}/{stage_name}/history/{offset}",
            get(history::stage_history),
        )
        .route(
            "/stages/{pipeline_name}/{stage_name}/pages/{page_number}",
            get(history::stage_history_page),
        )
        .route(
            "/jobs/{pipeline_name}/{stage_name}/{job_name}/history",
            get(history::job_history),
        )
        .route(
            "/jobs/{pipeline_name}/{stage_name}/{job_name}/history/{offset}",
            get(history::job_history),
        )
        .route("/agents/{uuid}/job_run_history", get(history::agent_job_history))
        .route(
            "/agents/{uuid}/job_run_history/{offset}",
            get(history::agent_job_history),
        );

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api", history_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .with_state(state)
        .merge(swagger_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};

    use super::*;
    use crate::application::HistorySettings;
    use crate::domain::{JobRun, PipelineRun, RunResult, StageRun};
    use crate::interfaces::http::modules::request_context::USERNAME_HEADER;
    use crate::interfaces::http::modules::request_id::REQUEST_ID_HEADER;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    /// `up42` with `runs` runs of stage `build` / job `compile` on agent
    /// `agent-1`, plus a private pipeline only `alice` may view.
    fn app(runs: u64) -> Router {
        let store = InMemoryHistoryStore::new();
        for counter in 1..=runs {
            let t = at(counter as i64 * 10);
            store.record_run(
                PipelineRun::new("up42", counter, t).with_stage(
                    StageRun::new("build", 1, t)
                        .with_result(RunResult::Passed)
                        .with_job(
                            JobRun::new("compile", t)
                                .on_agent("agent-1")
                                .with_result(RunResult::Passed),
                        ),
                ),
            );
        }
        store.record_run(PipelineRun::new("secret", 1, at(5)).with_stage(
            StageRun::new("deploy", 1, at(5)).with_job(JobRun::new("ship", at(5)).on_agent("agent-1")),
        ));
        store.restrict_viewers("secret", ["alice"]);

        let store = Arc::new(store);
        let service = Arc::new(HistoryService::new(store.clone(), HistorySettings::default()));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        create_api_router(service, store, handle)
    }

    async fn send(router: Router, req: Request<Body>) -> Response<Body> {
        use tower::Service;
        let mut svc = router.into_service();
        svc.call(req).await.unwrap()
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let resp = send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn counters(body: &Value) -> Vec<u64> {
        body["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["counter"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn pipeline_history_defaults_to_first_page() {
        let (status, body) = get_json(app(25), "/api/pipelines/up42/history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["pagination"],
            json!({"total": 25, "pageSize": 10, "offset": 0, "nextOffset": 10})
        );
        assert_eq!(counters(&body), (16..=25).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn pipeline_history_with_offset_and_ascending_order() {
        let (status, body) = get_json(app(25), "/api/pipelines/up42/history/10?order=asc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["pagination"],
            json!({"total": 25, "pageSize": 10, "offset": 10, "previousOffset": 0, "nextOffset": 20})
        );
        assert_eq!(counters(&body), (11..=20).collect::<Vec<_>>());
        assert_eq!(body["pages"][0], json!({"kind": "previous", "number": 1}));
    }

    #[tokio::test]
    async fn offset_past_end_is_clamped() {
        let (status, body) = get_json(app(25), "/api/pipelines/up42/history/999").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["offset"], 24);
        assert_eq!(counters(&body), vec![1]);
    }

    #[tokio::test]
    async fn negative_offset_starts_at_zero() {
        let (_, body) = get_json(app(25), "/api/pipelines/up42/history/-5").await;
        assert_eq!(body["pagination"]["offset"], 0);
    }

    #[tokio::test]
    async fn stage_and_job_listings() {
        let (status, body) = get_json(app(3), "/api/stages/up42/build/history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["history"][0]["pipeline_counter"], 3);
        assert_eq!(body["history"][0]["name"], "build");

        let (status, body) = get_json(app(3), "/api/jobs/up42/build/compile/history/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["offset"], 1);
        assert_eq!(body["history"][0]["pipeline_counter"], 2);
        assert_eq!(body["history"][0]["agent_uuid"], "agent-1");
    }

    #[tokio::test]
    async fn agent_history_hides_private_pipelines() {
        let (_, body) = get_json(app(3), "/api/agents/agent-1/job_run_history").await;
        assert_eq!(body["pagination"]["total"], 3);

        let req = Request::builder()
            .uri("/api/agents/agent-1/job_run_history")
            .header(USERNAME_HEADER, "alice")
            .body(Body::empty())
            .unwrap();
        let resp = send(app(3), req).await;
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["pagination"]["total"], 4);
    }

    #[tokio::test]
    async fn unknown_agent_is_empty_listing() {
        let (status, body) = get_json(app(3), "/api/agents/nobody/job_run_history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"], json!({"total": 0, "pageSize": 10, "offset": 0}));
        assert_eq!(body["history"], json!([]));
    }

    #[tokio::test]
    async fn stage_page_by_number() {
        let (status, body) =
            get_json(app(16), "/api/stages/up42/build/pages/3?page_size=4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["offset"], 8);
        assert_eq!(body["pagination"]["pageSize"], 4);
        let counters: Vec<u64> = body["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["pipeline_counter"].as_u64().unwrap())
            .collect();
        assert_eq!(counters, vec![8, 7, 6, 5]);
    }

    #[tokio::test]
    async fn page_for_counter() {
        let (status, body) = get_json(app(5), "/api/pipelines/up42/page_for/4?page_size=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"pipeline_name": "up42", "counter": 4, "page_size": 1, "page_number": 2})
        );
    }

    #[tokio::test]
    async fn latest_run_of_pipeline() {
        let (status, body) = get_json(app(3), "/api/pipelines/up42/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "up42");
        assert_eq!(body["counter"], 3);
        assert_eq!(body["stages"][0]["name"], "build");
    }

    #[tokio::test]
    async fn error_statuses() {
        let cases = [
            ("/api/pipelines/missing/history", StatusCode::NOT_FOUND),
            ("/api/pipelines/secret/history", StatusCode::FORBIDDEN),
            ("/api/pipelines/up42/history?order=up", StatusCode::BAD_REQUEST),
            ("/api/stages/up42/build/pages/1?page_size=0", StatusCode::BAD_REQUEST),
            ("/api/stages/up42/build/pages/1?page_size=301", StatusCode::BAD_REQUEST),
            ("/api/stages/up42/build/pages/1?page_size=abc", StatusCode::BAD_REQUEST),
            ("/api/pipelines/missing/latest", StatusCode::NOT_FOUND),
            ("/api/pipelines/secret/latest", StatusCode::FORBIDDEN),
            ("/api/pipelines/up42/page_for/9", StatusCode::BAD_REQUEST),
            ("/api/pipelines/up42/history/abc", StatusCode::BAD_REQUEST),
            ("/api/pipelines/up%2042/history", StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (uri, expected) in cases {
            let (status, body) = get_json(app(3), uri).await;
            assert_eq!(status, expected, "{}", uri);
            assert_eq!(body["success"], false, "{}", uri);
        }
    }

    #[tokio::test]
    async fn health_reports_store_size() {
        let (status, body) = get_json(app(3), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["pipeline_runs"], 4);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let resp = send(
            app(1),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn openapi_lists_history_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc
            .paths
            .paths
            .contains_key("/api/pipelines/{pipeline_name}/history/{offset}"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/agents/{uuid}/job_run_history/{offset}"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/pipelines/{pipeline_name}/latest"));
    }
}
