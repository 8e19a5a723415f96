pub mod memory;

pub use memory::{HistorySeed, InMemoryHistoryStore};
