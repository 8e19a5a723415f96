pub mod health;
pub mod history;
pub mod metrics;
pub mod request_context;
pub mod request_id;
