//! Error types for singbirds-ai
//!
//! `AcousticError` is the pipeline taxonomy (download, decode, dimension
//! mismatch, persistence, insufficient data). `ApiError` is what HTTP
//! handlers return.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the acoustic pipeline
#[derive(Debug, Error)]
pub enum AcousticError {
    /// Recording bytes could not be fetched (network, HTTP status, timeout, size cap)
    #[error("Download failed: {0}")]
    Download(String),

    /// Bytes could not be decoded, or nothing audible was left to analyze
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Feature extraction could not complete for a decoded recording
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A stored vector field had the wrong length; handled by zero-filling
    #[error("Dimension mismatch in {field}: expected {expected}, got {actual}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A bulk write was rejected; that batch's rows are unwritten
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Fewer than two usable vectors were available for projection
    #[error("Insufficient data: {usable} usable vector(s), at least 2 required")]
    InsufficientData { usable: usize },

    /// Caller supplied an invalid parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<singbirds_common::Error> for AcousticError {
    fn from(err: singbirds_common::Error) -> Self {
        match err {
            singbirds_common::Error::InvalidInput(msg) => AcousticError::InvalidInput(msg),
            other => AcousticError::Persistence(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request understood but not enough data to act on it (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// singbirds-common error
    #[error("Common error: {0}")]
    Common(#[from] singbirds_common::Error),
}

impl From<AcousticError> for ApiError {
    fn from(err: AcousticError) -> Self {
        match err {
            AcousticError::InvalidInput(msg) => ApiError::BadRequest(msg),
            AcousticError::InsufficientData { .. } => ApiError::Unprocessable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Malformed or mistyped request bodies are the caller's fault
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(singbirds_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(singbirds_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_maps_to_422() {
        let api: ApiError = AcousticError::InsufficientData { usable: 1 }.into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let api: ApiError = AcousticError::InvalidInput("batch_size must be >= 1".into()).into();
        assert_eq!(api.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_common_not_found_maps_to_404() {
        let api = ApiError::Common(singbirds_common::Error::NotFound("entity x".into()));
        assert_eq!(api.into_response().status(), StatusCode::NOT_FOUND);
    }
}
