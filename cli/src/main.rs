//! Run history API server
//!
//! ```sh
//! # Run with default config (~/.config/run-history/config.toml)
//! history-service
//!
//! # Custom config and seed data
//! history-service --config /etc/run-history/config.toml --seed fixtures/seed.json
//!
//! # Validate config without starting
//! history-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use run_history::config::AppConfig;
use run_history::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "history-service",
    version,
    about = "Paginated pipeline, stage, job and agent run history API",
    long_about = "REST API serving paginated run history of a CI/CD server.\n\n\
                  Default config: ~/.config/run-history/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "HISTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the JSON seed file the history store is loaded from.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(seed) = &self.seed {
            config.storage.seed_file = Some(seed.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(run_history::default_config_path);

    let loaded = AppConfig::load(&config_path);

    if cli.check {
        let mut config = loaded?;
        cli.apply_overrides(&mut config);
        config.validate()?;
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Log level   : {}", config.logging.level);
        println!(
            "   Seed file   : {}",
            config
                .storage
                .seed_file
                .as_ref()
                .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
        );
        return Ok(());
    }

    let config = match loaded {
        Ok(mut cfg) => {
            cli.apply_overrides(&mut cfg);
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let mut cfg = AppConfig::default();
            cli.apply_overrides(&mut cfg);
            init_tracing(&cfg);
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            cfg
        }
    };

    let handle = ServerHandle::start(ServerOptions {
        config,
        store: None,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.wait().await;

    Ok(())
}
