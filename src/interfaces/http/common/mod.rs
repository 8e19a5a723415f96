//! Shared HTTP extractors and error mapping

pub mod api_error;
pub mod validated_path;
pub mod validated_query;

pub use api_error::ApiError;
pub use validated_path::{ValidatedPath, ValidatedPathRejection};
pub use validated_query::{ValidatedQuery, ValidatedQueryRejection};
