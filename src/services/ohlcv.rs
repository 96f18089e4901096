//! Multi-timeframe OHLCV from Kraken with a read-through cache.

use crate::error::ApiError;
use crate::fetch::{BatchRunner, CacheStats, ReadCache, RetryFailure, WorkItem, aggregate};
use crate::models::{
    AllTimeframesResponse, FailureDetail, FormattedOhlcvResponse, OhlcvRange, OhlcvSeries,
    QuoteError, QuoteErrorCode, TimeframeResult,
};
use crate::ohlc::{format_candles, rows_to_candles};
use crate::upstream::{KrakenClient, UpstreamError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache key: uppercased ticker and range.
pub type SeriesKey = (String, OhlcvRange);

/// Cache shared between requests.
pub type SeriesCache = Arc<dyn ReadCache<SeriesKey, OhlcvSeries>>;

impl WorkItem for OhlcvRange {
    fn label(&self) -> String {
        self.as_str().to_string()
    }
}

/// OHLCV service.
#[derive(Clone)]
pub struct OhlcvService {
    client: KrakenClient,
    runner: BatchRunner,
    cache: Option<SeriesCache>,
}

impl std::fmt::Debug for OhlcvService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OhlcvService")
            .field("client", &self.client)
            .field("runner", &self.runner)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl OhlcvService {
    /// Creates the service. Pass `None` to disable caching.
    #[must_use]
    pub fn new(client: KrakenClient, runner: BatchRunner, cache: Option<SeriesCache>) -> Self {
        Self {
            client,
            runner,
            cache,
        }
    }

    /// Cache counters, when caching is enabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    async fn fetch_once(
        &self,
        ticker: &str,
        range: OhlcvRange,
    ) -> Result<Option<OhlcvSeries>, UpstreamError> {
        let Some(raw) = self.client.ohlc(ticker, range.interval_minutes()).await? else {
            return Ok(None);
        };
        let candles = rows_to_candles(&raw.rows).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(Some(OhlcvSeries {
            pair: raw.pair,
            interval_minutes: range.interval_minutes(),
            candles,
            last: raw.last,
        }))
    }

    /// One attempt: cache, then upstream. Non-empty results are cached.
    async fn load(
        &self,
        ticker: &str,
        range: OhlcvRange,
    ) -> Result<Option<OhlcvSeries>, UpstreamError> {
        let key = (ticker.to_string(), range);
        if let Some(cache) = &self.cache {
            if let Some(series) = cache.get(&key) {
                debug!(ticker, %range, "ohlcv cache hit");
                return Ok(Some(series));
            }
        }

        let series = self.fetch_once(ticker, range).await?;
        if let (Some(cache), Some(series)) = (&self.cache, &series) {
            cache.insert(key, series.clone(), range.cache_ttl());
        }
        Ok(series)
    }

    /// Fetches one range with retries. `Ok(None)` means Kraken had no candles.
    ///
    /// # Errors
    /// Returns the [`RetryFailure`] of the last attempt.
    pub async fn fetch_range(
        &self,
        ticker: &str,
        range: OhlcvRange,
    ) -> Result<Option<OhlcvSeries>, RetryFailure<UpstreamError>> {
        let label = format!("{ticker}-{range}");
        self.runner
            .retry_policy()
            .run(&label, || self.load(ticker, range))
            .await
    }

    /// Fetches every range concurrently.
    ///
    /// A range with no candles is reported with `data` and `error` both empty
    /// and does not count as a failure.
    ///
    /// # Errors
    /// Returns [`ApiError::AggregateFailure`] when every range failed.
    pub async fn fetch_all_timeframes(&self, ticker: &str) -> Result<AllTimeframesResponse, ApiError> {
        let started = std::time::Instant::now();
        let result = self
            .runner
            .run(OhlcvRange::ALL.to_vec(), |range: OhlcvRange| self.load(ticker, range))
            .await;

        let mut data = BTreeMap::new();
        for entry in result.iter() {
            let outcome = match &entry.outcome {
                Ok(series) => TimeframeResult {
                    data: series.clone(),
                    error: None,
                },
                Err(failure) => TimeframeResult {
                    data: None,
                    error: Some(QuoteError {
                        message: failure.to_string(),
                        code: failure.last_error.quote_code(),
                    }),
                },
            };
            data.insert(entry.label.clone(), outcome);
        }

        let report = aggregate(result);
        info!(
            ticker,
            ok = report.succeeded.len(),
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched all timeframes"
        );

        if report.is_complete_failure {
            return Err(ApiError::AggregateFailure {
                message: "Failed to fetch data for all timeframes".to_string(),
                failures: report.failed.into_iter().map(FailureDetail::from).collect(),
            });
        }

        let error = if report.is_partial_failure {
            warn!(ticker, failed = report.failed.len(), "some timeframes failed");
            Some(QuoteError {
                message: "Some timeframes failed to load".to_string(),
                code: QuoteErrorCode::PartialError,
            })
        } else {
            None
        };

        Ok(AllTimeframesResponse {
            ticker: ticker.to_string(),
            data,
            error,
        })
    }

    /// Chart-friendly candles for one range, empty when Kraken had none.
    ///
    /// # Errors
    /// Returns the [`ApiError`] mapped from the last upstream failure.
    pub async fn formatted(
        &self,
        symbol: &str,
        range: OhlcvRange,
    ) -> Result<FormattedOhlcvResponse, ApiError> {
        let series = self.fetch_range(symbol, range).await?;
        let data = series
            .map(|s| format_candles(&s.candles))
            .unwrap_or_default();
        Ok(FormattedOhlcvResponse {
            source: "kraken".to_string(),
            symbol: symbol.to_string(),
            interval: range,
            data,
        })
    }
}

#[cfg(test)]
mod tests;
