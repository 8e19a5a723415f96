//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle (metrics recorder, history store,
//! REST API, graceful shutdown) for the CLI binary.

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{error, info, warn};

use crate::application::{HistoryService, HistorySettings};
use crate::config::{AppConfig, LogFormat};
use crate::infrastructure::storage::InMemoryHistoryStore;
use crate::interfaces::create_api_router;
use crate::shared::ShutdownCoordinator;

/// Options for starting the server.
#[derive(Default)]
pub struct ServerOptions {
    pub config: AppConfig,
    /// Store to serve from; when unset, one is built from
    /// `config.storage.seed_file` (or left empty).
    pub store: Option<Arc<InMemoryHistoryStore>>,
}

/// Handle to a running server.
///
/// ```rust,no_run
/// use run_history::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub store: Arc<InMemoryHistoryStore>,
    pub config: AppConfig,
    /// Address the API is bound to; port 0 in the config resolves here.
    pub local_addr: std::net::SocketAddr,

    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

/// The global recorder can only be installed once per process; restarts
/// within one process reuse it.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!("Metrics recorder not installed, /metrics will be empty: {}", e);
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting run history service...");

        let prometheus_handle = prometheus_handle();

        let store = match (opts.store, &app_cfg.storage.seed_file) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(InMemoryHistoryStore::from_seed_file(path)?),
            (None, None) => {
                info!("No seed file configured; starting with an empty history store");
                Arc::new(InMemoryHistoryStore::new())
            }
        };

        let settings = HistorySettings::from(&app_cfg.history);
        info!(
            "Page sizes: pipeline={} stage={} job={} agent={} (max {})",
            settings.pipeline_page_size,
            settings.stage_page_size,
            settings.job_page_size,
            settings.agent_job_page_size,
            settings.max_page_size
        );
        let service = Arc::new(HistoryService::new(store.clone(), settings));

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let api_router = create_api_router(service, store.clone(), prometheus_handle);

        let api_addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            shutdown_signal.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            store,
            config: app_cfg,
            local_addr,
            shutdown,
            api_task,
        })
    }

    /// Installs SIGTERM / SIGINT listeners that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Waits for the shutdown signal, then for in-flight requests to drain
    /// within `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            shutdown, api_task, ..
        } = self;
        let abort = api_task.abort_handle();

        let drained = shutdown
            .shutdown_with_cleanup(|| async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task failed: {}", e),
                }
            })
            .await;

        if !drained {
            abort.abort();
        }
        info!("Run history service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("Shutting down run history service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initializes tracing from the logging config. `RUST_LOG` overrides
/// `logging.level`.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::ServerConfig;
    use crate::domain::PipelineRun;

    fn local_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                shutdown_timeout: 5,
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn starts_and_shuts_down() {
        let store = Arc::new(InMemoryHistoryStore::new());
        store.record_run(PipelineRun::new("up42", 1, Utc::now()));

        let handle = ServerHandle::start(ServerOptions {
            config: local_config(),
            store: Some(store),
        })
        .await
        .unwrap();

        assert!(handle.is_running());
        assert_ne!(handle.local_addr.port(), 0);
        assert_eq!(handle.store.run_count(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn triggered_shutdown_stops_listener() {
        let handle = ServerHandle::start(ServerOptions {
            config: local_config(),
            store: None,
        })
        .await
        .unwrap();
        let addr = handle.local_addr;

        handle.trigger_shutdown();
        handle.wait().await;

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn missing_seed_file_fails_start() {
        let mut config = local_config();
        config.storage.seed_file = Some("/nonexistent/seed.json".into());

        let result = ServerHandle::start(ServerOptions {
            config,
            store: None,
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn invalid_page_sizes_fail_start() {
        let mut config = local_config();
        config.history.pipeline_page_size = 0;

        let result = ServerHandle::start(ServerOptions {
            config,
            store: None,
        })
        .await;
        assert!(result.is_err());
    }
}
