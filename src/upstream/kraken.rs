//! Kraken public OHLC client.

use super::{UpstreamError, read_json};
use crate::ohlc::KrakenRow;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<Map<String, Value>>,
}

/// Raw series returned by Kraken for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct KrakenSeries {
    /// Pair name as keyed by Kraken (e.g. "XXBTZUSD").
    pub pair: String,
    /// Candle rows, oldest first.
    pub rows: Vec<KrakenRow>,
    /// Polling cursor.
    pub last: Option<i64>,
}

/// Client for `GET /0/public/OHLC`.
#[derive(Debug, Clone)]
pub struct KrakenClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl KrakenClient {
    /// Creates a client against `base_url` (e.g. "https://api.kraken.com").
    #[must_use]
    pub fn new(http: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Fetches candles for `{ticker}USD` at the given interval.
    ///
    /// Returns `Ok(None)` when Kraken answers without any candles.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Api`] with Kraken's first error string when the
    /// payload reports one, and status/transport/decode variants otherwise.
    pub async fn ohlc(
        &self,
        ticker: &str,
        interval_minutes: u32,
    ) -> Result<Option<KrakenSeries>, UpstreamError> {
        let pair = format!("{}USD", ticker.to_uppercase());
        let interval = interval_minutes.to_string();
        let query = serde_urlencoded::to_string([
            ("pair", pair.as_str()),
            ("interval", interval.as_str()),
        ])
        .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let url = format!("{}/0/public/OHLC?{}", self.base_url, query);

        debug!(%pair, interval_minutes, "fetching kraken ohlc");
        let resp = self.http.get(&url).timeout(self.timeout).send().await?;
        let envelope: Envelope = read_json(resp).await?;

        if let Some(first) = envelope.error.into_iter().next() {
            return Err(UpstreamError::Api(first));
        }

        let Some(mut result) = envelope.result else {
            return Ok(None);
        };

        let last = result.remove("last").and_then(|v| v.as_i64());
        let Some((pair, rows)) = result.into_iter().next() else {
            return Ok(None);
        };

        let rows: Vec<KrakenRow> = serde_json::from_value(rows)?;
        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(KrakenSeries { pair, rows, last }))
    }
}
