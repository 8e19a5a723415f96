//! `RequestContext` extractor
//!
//! Builds the caller context from the [`RequestId`] extension set by
//! [`request_id_middleware`](super::request_id::request_id_middleware) and
//! the `X-Username` header. Authentication happens upstream; the header is
//! trusted as given.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::request_id::RequestId;
use crate::domain::{RequestContext, ANONYMOUS};

/// Header carrying the authenticated caller's username.
pub const USERNAME_HEADER: &str = "x-username";

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let username = parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS);

        Ok(RequestContext::new(request_id, username))
    }
}
