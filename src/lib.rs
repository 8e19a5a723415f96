//! # Run History
//!
//! Paginated run history for a CI/CD server: pipeline, stage and job runs,
//! plus the job runs executed by an agent.
//!
//! ## Architecture
//!
//! - **shared**: `Pagination`, `DomainError`, validators, shutdown signal
//! - **domain**: run records, listing scopes and the `HistorySource` trait
//! - **application**: `HistoryService`, the count/paginate/fetch flow
//! - **infrastructure**: in-memory history store with JSON seeding
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime used by the CLI binary

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use application::{HistoryPage, HistoryService, HistorySettings};
pub use infrastructure::storage::InMemoryHistoryStore;
pub use interfaces::create_api_router;
pub use shared::{PageLink, Pagination};
