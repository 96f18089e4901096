//! Error types for the REST API.

use crate::fetch::RetryFailure;
use crate::models::{FailureDetail, QuoteErrorCode};
use crate::upstream::UpstreamError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;


/// API error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// Error body for batches in which every item failed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AggregateErrorResponse {
    /// Error message.
    pub error: String,
    /// Always `AGGREGATE_FAILURE`.
    pub code: String,
    /// Per-item reasons.
    pub failures: Vec<FailureDetail>,
}

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request. The message is returned verbatim.
    #[error("{0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single upstream call failed.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Failure description.
        message: String,
        /// Failure category.
        code: QuoteErrorCode,
    },

    /// Every item of a batch failed.
    #[error("{message}")]
    AggregateFailure {
        /// Summary message.
        message: String,
        /// Per-item reasons.
        failures: Vec<FailureDetail>,
    },

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND".to_string()),
            ApiError::Upstream { code, .. } => (StatusCode::BAD_GATEWAY, code.to_string()),
            ApiError::AggregateFailure { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AGGREGATE_FAILURE".to_string(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
            ),
        };

        if let ApiError::AggregateFailure { message, failures } = self {
            let body = Json(AggregateErrorResponse {
                error: message,
                code,
                failures,
            });
            return (status, body).into_response();
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code,
        });
        (status, body).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidTicker(_) => ApiError::InvalidRequest(err.to_string()),
            other => ApiError::Upstream {
                code: other.quote_code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<RetryFailure<UpstreamError>> for ApiError {
    fn from(failure: RetryFailure<UpstreamError>) -> Self {
        match &failure.last_error {
            UpstreamError::InvalidTicker(_) => ApiError::InvalidRequest(failure.last_error.to_string()),
            other => ApiError::Upstream {
                code: other.quote_code(),
                message: failure.to_string(),
            },
        }
    }
}
