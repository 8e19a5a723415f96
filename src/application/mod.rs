pub mod history;

pub use history::{HistoryPage, HistoryService, HistorySettings};
