//! Error types for the gateway client.

use crate::types::FailureDetail;
use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Query parameters could not be encoded.
    #[error("Query encoding failed: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    /// API returned an error response.
    #[error("API error ({status}, {code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the response body.
        code: String,
        /// Error message from API.
        message: String,
    },

    /// Every item of a batch failed.
    #[error("Batch failed: {message} ({} failures)", failures.len())]
    AggregateFailure {
        /// Summary message.
        message: String,
        /// Per-item reasons.
        failures: Vec<FailureDetail>,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Error code reported by the server, when there is one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::AggregateFailure { .. } => Some("AGGREGATE_FAILURE"),
            Self::NotFound(_) => Some("NOT_FOUND"),
            Self::InvalidRequest(_) => Some("INVALID_REQUEST"),
            Self::Http(_) | Self::Json(_) | Self::Query(_) => None,
        }
    }
}
