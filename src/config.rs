//! Configuration module
//!
//! Loaded from a TOML file (default `~/.config/run-history/config.toml`).
//! Every section and key is optional; missing values fall back to defaults.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8153
//! shutdown_timeout = 30
//!
//! [logging]
//! level = "info"
//! format = "pretty"   # or "json"
//!
//! [history]
//! pipeline_page_size = 10
//! stage_page_size = 10
//! job_page_size = 10
//! agent_job_page_size = 10
//! max_page_size = 300
//!
//! [storage]
//! seed_file = "/var/lib/run-history/seed.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::HistorySettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8153,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Page sizes of the history listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub pipeline_page_size: u64,
    pub stage_page_size: u64,
    pub job_page_size: u64,
    pub agent_job_page_size: u64,
    pub max_page_size: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let settings = HistorySettings::default();
        Self {
            pipeline_page_size: settings.pipeline_page_size,
            stage_page_size: settings.stage_page_size,
            job_page_size: settings.job_page_size,
            agent_job_page_size: settings.agent_job_page_size,
            max_page_size: settings.max_page_size,
        }
    }
}

impl From<&HistoryConfig> for HistorySettings {
    fn from(cfg: &HistoryConfig) -> Self {
        HistorySettings {
            pipeline_page_size: cfg.pipeline_page_size,
            stage_page_size: cfg.stage_page_size,
            job_page_size: cfg.job_page_size,
            agent_job_page_size: cfg.agent_job_page_size,
            max_page_size: cfg.max_page_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file with pipeline runs to preload; empty store when unset
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: AppConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let h = &self.history;
        let sizes = [
            ("pipeline_page_size", h.pipeline_page_size),
            ("stage_page_size", h.stage_page_size),
            ("job_page_size", h.job_page_size),
            ("agent_job_page_size", h.agent_job_page_size),
        ];
        for (name, size) in sizes {
            if size == 0 || size > h.max_page_size {
                return Err(ConfigError::Invalid(format!(
                    "history.{} must be within 1..={}, got {}",
                    name, h.max_page_size, size
                )));
            }
        }
        Ok(())
    }
}

/// `~/.config/run-history/config.toml`, or `./config.toml` when no config
/// directory is known.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("run-history").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/run-history.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.server.address(), "0.0.0.0:8153");
        assert_eq!(cfg.history.max_page_size, 300);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [server]
            port = 9090

            [history]
            pipeline_page_size = 25

            [logging]
            format = "json"
            "#,
        );

        let cfg = AppConfig::load(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.history.pipeline_page_size, 25);
        assert_eq!(cfg.history.job_page_size, 10);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.storage.seed_file.is_none());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let file = write_config("[server\nport = ");
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let file = write_config("[history]\nstage_page_size = 0\n");
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn page_size_above_maximum_is_rejected() {
        let file = write_config("[history]\njob_page_size = 50\nmax_page_size = 20\n");
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn history_settings_follow_config() {
        let cfg = HistoryConfig {
            agent_job_page_size: 50,
            ..HistoryConfig::default()
        };
        let settings = HistorySettings::from(&cfg);
        assert_eq!(settings.agent_job_page_size, 50);
        assert_eq!(settings.pipeline_page_size, 10);
    }
}
