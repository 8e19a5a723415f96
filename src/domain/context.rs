//! Per-request caller context
//!
//! Handlers build one [`RequestContext`] per request and pass it explicitly
//! into services and history sources; nothing request-scoped lives in
//! shared state.

use uuid::Uuid;

/// Username used when the caller did not identify itself.
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation id, echoed in `X-Request-Id`
    pub request_id: String,
    pub username: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            username: username.into(),
        }
    }

    /// Context for an unidentified caller with a fresh request id.
    pub fn anonymous() -> Self {
        Self::new(Uuid::new_v4().to_string(), ANONYMOUS)
    }

    /// Context for `username` with a fresh request id.
    pub fn for_user(username: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), username)
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS
    }
}
