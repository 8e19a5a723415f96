//! Prometheus scrape endpoint and request metrics

pub mod handlers;
pub mod middleware;

pub use handlers::{prometheus_metrics, record_history_page, MetricsState};
pub use middleware::http_metrics_middleware;
