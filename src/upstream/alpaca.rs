//! Alpaca options contracts client.

use super::{UpstreamError, read_json};
use crate::models::{OptionContract, OptionType};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const PAGE_LIMIT: u32 = 100;

/// Inclusive expiration date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationWindow {
    /// Window name used in logs and failure reports.
    pub label: String,
    /// First expiration date.
    pub start: NaiveDate,
    /// Last expiration date.
    pub end: NaiveDate,
}

impl crate::fetch::WorkItem for ExpirationWindow {
    fn label(&self) -> String {
        self.label.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ContractsPage {
    #[serde(default)]
    option_contracts: Option<Vec<OptionContract>>,
}

/// Client for `GET /v2/options/contracts`.
#[derive(Clone)]
pub struct AlpacaClient {
    http: Client,
    base_url: String,
    key_id: String,
    secret_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AlpacaClient {
    /// Creates a client authenticating with the given key pair.
    #[must_use]
    pub fn new(
        http: Client,
        base_url: &str,
        key_id: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            secret_key: secret_key.into(),
            timeout,
        }
    }

    /// Lists active contracts for `ticker` expiring within `window`.
    ///
    /// Only the first page (100 contracts) is read.
    ///
    /// # Errors
    /// Returns [`UpstreamError::InvalidTicker`] when Alpaca answers 422, and
    /// status/transport/decode variants otherwise.
    pub async fn option_contracts(
        &self,
        ticker: &str,
        option_type: OptionType,
        window: &ExpirationWindow,
    ) -> Result<Vec<OptionContract>, UpstreamError> {
        let start = window.start.format("%Y-%m-%d").to_string();
        let end = window.end.format("%Y-%m-%d").to_string();
        let limit = PAGE_LIMIT.to_string();
        let query = serde_urlencoded::to_string([
            ("underlying_symbol", ticker),
            ("status", "active"),
            ("expiration_date_gte", start.as_str()),
            ("expiration_date_lte", end.as_str()),
            ("type", option_type.as_str()),
            ("limit", limit.as_str()),
        ])
        .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let url = format!("{}/v2/options/contracts?{}", self.base_url, query);

        debug!(ticker, window = %window.label, %start, %end, "listing option contracts");
        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .send()
            .await?;

        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            warn!(ticker, "alpaca rejected ticker symbol");
            return Err(UpstreamError::InvalidTicker(ticker.to_string()));
        }

        let page: ContractsPage = read_json(resp).await?;
        Ok(page.option_contracts.unwrap_or_default())
    }
}
