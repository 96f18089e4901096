//! Request and response types for the gateway API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;


/// Chart range accepted by the OHLCV endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OhlcvRange {
    /// One day of 1 minute candles.
    #[serde(rename = "1d")]
    OneDay,
    /// One week of 15 minute candles.
    #[serde(rename = "1w")]
    OneWeek,
    /// One month of 1 hour candles.
    #[serde(rename = "1m")]
    OneMonth,
    /// Three months of 4 hour candles.
    #[serde(rename = "3m")]
    ThreeMonths,
    /// One year of daily candles.
    #[serde(rename = "1y")]
    OneYear,
}

impl OhlcvRange {
    /// Label used in query strings and response maps.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::OneYear => "1y",
        }
    }
}

impl std::fmt::Display for OhlcvRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option.
    #[default]
    Call,
    /// Put option.
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

// ============================================================================
// Health & Errors
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Per-item failure reported by batch endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Position of the work item in the batch.
    pub index: usize,
    /// Work item label.
    pub label: String,
    /// Error from the last attempt.
    pub reason: String,
    /// Attempts made.
    pub attempts: u32,
    /// `true` when retries ran out on a transient error.
    pub exhausted: bool,
    /// Offset of the first missing identifier (token metadata only).
    #[serde(default)]
    pub offset: Option<usize>,
    /// Identifiers left without metadata (token metadata only).
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Error body returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Per-item reasons for `AGGREGATE_FAILURE`.
    #[serde(default)]
    pub failures: Vec<FailureDetail>,
}

// ============================================================================
// Token Metadata
// ============================================================================

/// Token metadata request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadataRequest {
    /// Asset identifiers.
    pub ids: Vec<String>,
}

/// Token metadata response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadataResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier.
    pub id: String,
    /// Asset records in input order.
    pub result: Vec<serde_json::Value>,
    /// `true` when some chunks failed.
    pub partial: bool,
    /// Failed chunks.
    #[serde(default)]
    pub failures: Vec<FailureDetail>,
}

// ============================================================================
// OHLCV
// ============================================================================

/// A single candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle start, seconds since epoch.
    pub timestamp: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Volume weighted average price.
    pub vwap: f64,
    /// Traded volume.
    pub volume: f64,
    /// Number of trades.
    pub trade_count: u64,
}

/// Candles for one pair and interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSeries {
    /// Upstream pair name.
    pub pair: String,
    /// Candle interval in minutes.
    pub interval_minutes: u32,
    /// Candles, oldest first.
    pub candles: Vec<Candle>,
    /// Upstream polling cursor.
    pub last: Option<i64>,
}

/// Error attached to an OHLCV result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteError {
    /// Human-readable message.
    pub message: String,
    /// Error category, e.g. `HTTP_ERROR` or `PARTIAL_ERROR`.
    pub code: String,
}

/// Outcome for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeResult {
    /// Series, when available.
    pub data: Option<OhlcvSeries>,
    /// Failure, when the timeframe could not be fetched.
    pub error: Option<QuoteError>,
}

impl TimeframeResult {
    /// `true` when the upstream answered without candles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

/// Response for a single range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvRangeResponse {
    /// Normalized ticker.
    pub ticker: String,
    /// Requested range.
    pub range: OhlcvRange,
    /// Series, or `None` when the upstream had no candles.
    pub data: Option<OhlcvSeries>,
}

/// Response covering every range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllTimeframesResponse {
    /// Normalized ticker.
    pub ticker: String,
    /// Per-range outcome keyed by range label.
    pub data: BTreeMap<String, TimeframeResult>,
    /// Set when some ranges failed.
    pub error: Option<QuoteError>,
}

impl AllTimeframesResponse {
    /// Outcome for `range`.
    #[must_use]
    pub fn timeframe(&self, range: OhlcvRange) -> Option<&TimeframeResult> {
        self.data.get(range.as_str())
    }
}

/// Chart-friendly candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormattedCandle {
    /// Candle start, seconds since epoch.
    pub timestamp: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

/// Formatted OHLCV response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedOhlcvResponse {
    /// Data provider.
    pub source: String,
    /// Normalized ticker.
    pub symbol: String,
    /// Requested range.
    pub interval: OhlcvRange,
    /// Candles, oldest first.
    pub data: Vec<FormattedCandle>,
}

// ============================================================================
// Options
// ============================================================================

/// Option contract as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC symbol.
    pub symbol: String,
    /// Contract id.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Underlying ticker.
    #[serde(default)]
    pub underlying_symbol: Option<String>,
    /// Expiration date (YYYY-MM-DD).
    pub expiration_date: String,
    /// `call` or `put`.
    #[serde(default, rename = "type")]
    pub contract_type: Option<String>,
    /// Exercise style.
    #[serde(default)]
    pub style: Option<String>,
    /// Strike price.
    #[serde(default)]
    pub strike_price: Option<String>,
    /// Open interest.
    #[serde(default)]
    pub open_interest: Option<String>,
    /// Date of the open interest figure.
    #[serde(default)]
    pub open_interest_date: Option<String>,
    /// Last close price.
    #[serde(default)]
    pub close_price: Option<String>,
}

/// Highest open-interest contracts per expiration window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighOpenInterestResponse {
    /// Normalized ticker.
    pub ticker: String,
    /// Contract type searched.
    pub option_type: OptionType,
    /// Best contract expiring within 60 days.
    pub short_term: Option<OptionContract>,
    /// Best contract expiring in one to two years.
    pub leap: Option<OptionContract>,
    /// Set when some windows failed.
    pub error: Option<String>,
    /// Failed windows.
    #[serde(default)]
    pub failures: Vec<FailureDetail>,
}

// ============================================================================
// Cache
// ============================================================================

/// OHLCV cache counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    /// Stored entries.
    pub entries: usize,
    /// Configured bound, 0 when unbounded.
    pub max_entries: usize,
    /// Reads served from cache.
    pub hits: u64,
    /// Reads that went upstream.
    pub misses: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// `hits / (hits + misses)`.
    pub hit_ratio: f64,
}
