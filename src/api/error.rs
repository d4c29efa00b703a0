use crate::error::DomainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Malformed query or path input the domain never sees.
    #[error("{0}")]
    BadRequest(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Domain(DomainError::Internal(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::Domain(domain) => match domain {
                DomainError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED",
                    domain.to_string(),
                ),
                DomainError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", domain.to_string())
                }
                DomainError::Validation(message) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
                }
                DomainError::Conflict(message) => (StatusCode::CONFLICT, "CONFLICT", message),
                DomainError::Internal(source) => {
                    error!(error = %format!("{source:#}"), "internal API error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
