//! HTTP REST API
//!
//! - `common`: path validation extractor and error mapping
//! - `dto`: shared response shapes (pagination, error envelope)
//! - `modules`: handlers and request middleware
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod dto;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc};
