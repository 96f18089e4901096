//! HTTP client for the gateway API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;


/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Market Data Gateway API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a new client for `base_url` with the default timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_with_query<Q>(&self, path: &str, params: &Q) -> Result<String, Error>
    where
        Q: serde::Serialize + ?Sized,
    {
        let mut url = format!("{}{}", self.base_url, path);
        let query = serde_urlencoded::to_string(params)?;
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Token Metadata
    // ========================================================================

    /// Fetches metadata for the given asset identifiers.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRequest`] for rejected IDs and
    /// [`Error::AggregateFailure`] when every chunk failed.
    pub async fn token_metadata(&self, ids: &[String]) -> Result<TokenMetadataResponse, Error> {
        let url = format!("{}/api/v1/tokens/metadata", self.base_url);
        let request = TokenMetadataRequest { ids: ids.to_vec() };
        let resp = self.client.post(&url).json(&request).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // OHLCV
    // ========================================================================

    /// Gets OHLCV data for one range.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_ohlcv(
        &self,
        ticker: &str,
        range: OhlcvRange,
    ) -> Result<OhlcvRangeResponse, Error> {
        let url = self.url_with_query(
            "/api/v1/ohlcv",
            &[("ticker", ticker), ("range", range.as_str())],
        )?;
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets OHLCV data for every range.
    ///
    /// # Errors
    /// Returns [`Error::AggregateFailure`] when every range failed.
    pub async fn get_all_timeframes(&self, ticker: &str) -> Result<AllTimeframesResponse, Error> {
        let url = self.url_with_query("/api/v1/ohlcv", &[("ticker", ticker)])?;
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets chart-friendly candles. The server defaults to BTC and `1d`.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_formatted_ohlcv(
        &self,
        symbol: Option<&str>,
        interval: Option<OhlcvRange>,
    ) -> Result<FormattedOhlcvResponse, Error> {
        let mut params = Vec::new();
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol));
        }
        if let Some(interval) = interval {
            params.push(("interval", interval.as_str()));
        }
        let url = self.url_with_query("/api/v1/ohlcv/formatted", &params)?;
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Options
    // ========================================================================

    /// Gets the highest open-interest contracts for `ticker`.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_high_open_interest(
        &self,
        ticker: &str,
        option_type: OptionType,
    ) -> Result<HighOpenInterestResponse, Error> {
        let option_type = option_type.to_string();
        let url = self.url_with_query(
            "/api/v1/options/high-open-interest",
            &[("ticker", ticker), ("option_type", option_type.as_str())],
        )?;
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// Gets OHLCV cache counters.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when caching is disabled on the server.
    pub async fn get_cache_stats(&self) -> Result<CacheStatsResponse, Error> {
        let url = format!("{}/api/v1/cache/stats", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let Ok(body) = serde_json::from_str::<ErrorBody>(&text) else {
            return Err(if status.as_u16() == 404 {
                Error::NotFound(text)
            } else {
                Error::Api {
                    status: status.as_u16(),
                    code: "UNKNOWN".to_string(),
                    message: text,
                }
            });
        };

        Err(match (status.as_u16(), body.code.as_str()) {
            (_, "AGGREGATE_FAILURE") => Error::AggregateFailure {
                message: body.error,
                failures: body.failures,
            },
            (400, _) => Error::InvalidRequest(body.error),
            (404, _) => Error::NotFound(body.error),
            (status, _) => Error::Api {
                status,
                code: body.code,
                message: body.error,
            },
        })
    }
}
