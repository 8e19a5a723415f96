//! Data Transfer Objects shared by the REST API modules

pub mod common;

pub use common::*;
