//! Call sites built on the fetch core.
//!
//! Each service owns an upstream client and a [`BatchRunner`] configured for
//! its call site, validates input before any network call, and maps the
//! aggregated batch outcome to its own response policy.
//!
//! [`BatchRunner`]: crate::fetch::BatchRunner

pub mod ohlcv;
pub mod options;
pub mod token_meta;

pub use ohlcv::OhlcvService;
pub use options::OptionsService;
pub use token_meta::TokenMetaService;

use crate::error::ApiError;
use crate::fetch::FailureInfo;
use crate::models::FailureDetail;

const MAX_TICKER_LEN: usize = 16;

impl From<FailureInfo> for FailureDetail {
    fn from(info: FailureInfo) -> Self {
        Self {
            index: info.index,
            label: info.label,
            reason: info.reason,
            attempts: info.attempts,
            exhausted: info.exhausted,
            offset: None,
            ids: Vec::new(),
        }
    }
}

/// Trims, validates and uppercases a ticker query parameter.
///
/// # Errors
/// Returns [`ApiError::InvalidRequest`] when the parameter is missing, blank,
/// too long, or contains anything but ASCII letters and digits.
pub fn normalize_ticker(raw: Option<&str>, param: &str) -> Result<String, ApiError> {
    let ticker = raw.map(str::trim).unwrap_or_default();
    if ticker.is_empty() {
        return Err(ApiError::InvalidRequest(format!(
            "Missing '{param}' query parameter"
        )));
    }
    if ticker.len() > MAX_TICKER_LEN || !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::InvalidRequest(format!(
            "Invalid '{param}': {ticker}"
        )));
    }
    Ok(ticker.to_ascii_uppercase())
}
