//! Query string extractor with an `ApiResponse` error body
//!
//! `ValidatedQuery<T>` works like `axum::extract::Query<T>`, but a query
//! string that fails to deserialize (e.g. `?page_size=abc`) is rejected with
//! a 400 `ApiResponse` envelope instead of axum's plain-text body.

use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::interfaces::http::dto::ApiResponse;

pub struct ValidatedQuery<T>(pub T);

pub struct ValidatedQueryRejection(QueryRejection);

impl IntoResponse for ValidatedQueryRejection {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(format!("Invalid query: {}", self.0.body_text()));
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ValidatedQueryRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidatedQueryRejection)?;
        Ok(ValidatedQuery(value))
    }
}
