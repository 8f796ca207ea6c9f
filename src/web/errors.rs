//! # API Errors
//!
//! Maps orchestrator errors onto HTTP responses with a stable JSON body:
//! `{"error": {"code": "...", "message": "..."}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::OrchestratorError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Service temporarily unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        let message = error.to_string();
        match error {
            OrchestratorError::NotFound { .. } => ApiError::NotFound { message },
            OrchestratorError::ValidationError(_) => ApiError::BadRequest { message },
            OrchestratorError::RegistryUnavailable(_) | OrchestratorError::StorageUnavailable(_) => {
                ApiError::ServiceUnavailable { message }
            }
            _ => ApiError::Internal { message },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::NotFound { message } => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            ApiError::BadRequest { message } => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                message,
            ),
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                message,
            ),
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_errors_map_to_status_codes() {
        let cases = [
            (OrchestratorError::NotFound { farm_id: 7 }, StatusCode::NOT_FOUND),
            (
                OrchestratorError::ValidationError("bad date".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestratorError::storage_unavailable("down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                OrchestratorError::aggregation_failed("WEEK", "boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
