//! Run history aggregate
//!
//! Pipeline, stage and job run records, listing scopes, and the source
//! interface history listings are read from.

pub mod model;
pub mod repository;

pub use model::{
    HistoryKind, HistoryRecord, HistoryScope, JobRun, PipelineRun, RunResult, SortOrder, StageRun,
};
pub use repository::HistorySource;
