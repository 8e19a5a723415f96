pub mod context;
pub mod history;

pub use context::{RequestContext, ANONYMOUS};
pub use history::{
    HistoryKind, HistoryRecord, HistoryScope, HistorySource, JobRun, PipelineRun, RunResult,
    SortOrder, StageRun,
};

// Re-export DomainError from shared for convenience
pub use crate::shared::types::errors::{DomainError, DomainResult};
