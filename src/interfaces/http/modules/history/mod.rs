//! Paginated run history listings

pub mod dto;
pub mod handlers;

pub use handlers::*;
