//! Infrastructure layer
//!
//! - **storage**: history source implementations

pub mod storage;

pub use storage::{HistorySeed, InMemoryHistoryStore};
