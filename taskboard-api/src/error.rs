//! Error handling for the API server
//!
//! Handlers return `Result<T, ApiError>`; the error converts itself into an
//! HTTP status plus a JSON body:
//!
//! ```json
//! { "error": "not_found", "message": "task not found" }
//! ```
//!
//! Repository errors map onto statuses one to one. Store failures are logged
//! and reported as a bare 500 so backend details never reach clients.
//!
//! # Example
//!
//! ```
//! use taskboard_api::error::{ApiError, ApiResult};
//! use axum::Json;
//!
//! async fn handler(found: bool) -> ApiResult<Json<&'static str>> {
//!     if !found {
//!         return Err(ApiError::NotFound("task not found".to_string()));
//!     }
//!     Ok(Json("ok"))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::auth::middleware::AuthError;
use taskboard_shared::repo::RepoError;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unprocessable entity (422)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(e) => ApiError::ValidationError(vec![ValidationErrorDetail {
                field: e.field().to_string(),
                message: e.to_string(),
            }]),
            RepoError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RepoError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            RepoError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            RepoError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_shared::models::ValidationError;
    use taskboard_shared::store::StoreError;

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("task not found".to_string());
        assert_eq!(err.to_string(), "Not found: task not found");

        let err = ApiError::ValidationError(vec![]);
        assert_eq!(err.to_string(), "Validation failed: 0 errors");
    }

    #[test]
    fn test_repo_error_statuses() {
        let cases = [
            (RepoError::Validation(ValidationError::EmptyField("body")), StatusCode::UNPROCESSABLE_ENTITY),
            (RepoError::NotFound("task"), StatusCode::NOT_FOUND),
            (RepoError::Forbidden("comment"), StatusCode::FORBIDDEN),
            (RepoError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                RepoError::Store(StoreError::Unavailable("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_detail_names_field() {
        let err = ApiError::from(RepoError::Validation(ValidationError::EmptyField("body")));
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "body");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
