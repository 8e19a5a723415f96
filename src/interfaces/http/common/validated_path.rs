//! Validated path extractor for Axum
//!
//! `ValidatedPath<T>` works like `axum::extract::Path<T>`, but additionally
//! runs `validator::Validate::validate()` on the deserialized segments.
//! Malformed segments (e.g. a non-numeric offset) give 400; segments that
//! parse but fail validation give 422 with field-level details.

use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::interfaces::http::dto::ApiResponse;

/// An extractor that deserializes path parameters and validates them.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct PipelinePath {
///     #[validate(custom(function = "validate_name"))]
///     pipeline_name: String,
/// }
///
/// async fn handler(ValidatedPath(path): ValidatedPath<PipelinePath>) {}
/// ```
pub struct ValidatedPath<T>(pub T);

pub enum ValidatedPathRejection {
    PathError(PathRejection),
    ValidationError(validator::ValidationErrors),
}

impl IntoResponse for ValidatedPathRejection {
    fn into_response(self) -> Response {
        match self {
            Self::PathError(rejection) => {
                let body = ApiResponse::<()>::error(format!("Invalid path: {}", rejection.body_text()));
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::ValidationError(errors) => {
                let mut field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| {
                            let msg = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            format!("{}: {}", field, msg)
                        })
                    })
                    .collect();
                field_errors.sort();

                let message = if field_errors.is_empty() {
                    "Validation failed".to_string()
                } else {
                    field_errors.join("; ")
                };

                let body = ApiResponse::<()>::error(message);
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ValidatedPathRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidatedPathRejection::PathError)?;

        value
            .validate()
            .map_err(ValidatedPathRejection::ValidationError)?;

        Ok(ValidatedPath(value))
    }
}
