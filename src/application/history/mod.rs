pub mod service;

pub use service::{HistoryPage, HistoryService, HistorySettings};
