//! HTTP clients for the upstream market-data providers.
//!
//! Every client returns [`UpstreamError`], which knows whether a failed call
//! is worth repeating. The batch runner relies on that classification to
//! decide between backing off and giving up.

pub mod alpaca;
pub mod helius;
pub mod kraken;

pub use alpaca::{AlpacaClient, ExpirationWindow};
pub use helius::HeliusClient;
pub use kraken::KrakenClient;

use crate::fetch::Retryable;
use crate::models::QuoteErrorCode;
use reqwest::Response;
use serde::de::DeserializeOwned;

/// JSON-RPC error codes that indicate a transient condition.
const RETRYABLE_RPC_CODES: [i64; 3] = [
    -32005, // limit exceeded
    -32603, // internal error
    429,
];

/// Substrings of upstream error messages that indicate throttling or an
/// unavailable service.
const RETRYABLE_API_MARKERS: [&str; 5] = [
    "rate limit",
    "too many requests",
    "unavailable",
    "busy",
    "429",
];

/// Upstream call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Non-success HTTP status.
    #[error("upstream returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The per-attempt timeout elapsed.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// Error reported inside an otherwise successful payload.
    #[error("{0}")]
    Api(String),

    /// The upstream rejected the ticker symbol.
    #[error("Invalid ticker symbol: {0}")]
    InvalidTicker(String),
}

impl UpstreamError {
    /// Category used in OHLCV error payloads.
    #[must_use]
    pub fn quote_code(&self) -> QuoteErrorCode {
        match self {
            Self::Status { .. } => QuoteErrorCode::HttpError,
            Self::Api(_) | Self::Rpc { .. } => QuoteErrorCode::ApiError,
            Self::InvalidTicker(_) => QuoteErrorCode::ValidationError,
            Self::Timeout | Self::Transport(_) | Self::Decode(_) => QuoteErrorCode::UnknownError,
        }
    }
}

impl Retryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout | Self::Transport(_) => true,
            Self::Rpc { code, .. } => RETRYABLE_RPC_CODES.contains(code),
            Self::Api(message) => {
                let message = message.to_lowercase();
                RETRYABLE_API_MARKERS
                    .iter()
                    .any(|marker| message.contains(marker))
            }
            Self::Decode(_) | Self::InvalidTicker(_) => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

const MAX_ERROR_BODY: usize = 512;

/// Reads a response, mapping non-success statuses to [`UpstreamError::Status`]
/// and decoding the body as JSON otherwise.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, UpstreamError> {
    let status = resp.status();
    if !status.is_success() {
        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
