//! `GET /metrics` and history-listing metrics

use axum::{extract::State, http::header, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::domain::HistoryKind;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
}

/// Renders the global recorder in Prometheus text format.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.handle.render(),
    )
}

/// Records one served history page:
/// `history_pages_total{kind}` and `history_page_records{kind}`.
pub fn record_history_page(kind: HistoryKind, records: usize) {
    let kind = kind_label(kind);
    metrics::counter!("history_pages_total", "kind" => kind).increment(1);
    metrics::histogram!("history_page_records", "kind" => kind).record(records as f64);
}

fn kind_label(kind: HistoryKind) -> &'static str {
    match kind {
        HistoryKind::Pipeline => "pipeline",
        HistoryKind::Stage => "stage",
        HistoryKind::Job => "job",
        HistoryKind::AgentJobs => "agent_jobs",
    }
}
