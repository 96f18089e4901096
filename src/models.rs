//! Request and response models for the REST API.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Per-item failure reported by batch endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailureDetail {
    /// Position of the work item in the batch.
    pub index: usize,
    /// Work item label (chunk, timeframe or expiration window).
    pub label: String,
    /// Error from the last attempt.
    pub reason: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// `true` when retries ran out on a transient error.
    pub exhausted: bool,
    /// Offset of the first missing identifier in the request (token metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Identifiers left without metadata (token metadata).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

// ============================================================================
// Token Metadata
// ============================================================================

/// Token metadata request body.
///
/// `ids` may be a single identifier or a list of identifiers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenMetadataRequest {
    /// Asset identifiers.
    #[schema(value_type = Vec<String>)]
    pub ids: serde_json::Value,
}

/// Token metadata response in JSON-RPC shape.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenMetadataResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier.
    pub id: String,
    /// Asset records from every successful chunk, in input order.
    #[schema(value_type = Vec<Object>)]
    pub result: Vec<serde_json::Value>,
    /// `true` when some chunks failed.
    pub partial: bool,
    /// Failed chunks.
    pub failures: Vec<FailureDetail>,
}

// ============================================================================
// OHLCV
// ============================================================================

/// Chart range supported by the OHLCV endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
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
    /// Every range, in display order.
    pub const ALL: [OhlcvRange; 5] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::OneYear,
    ];

    /// Candle interval requested from Kraken, in minutes.
    #[must_use]
    pub fn interval_minutes(&self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 15,
            Self::OneMonth => 60,
            Self::ThreeMonths => 240,
            Self::OneYear => 1440,
        }
    }

    /// How long a fetched series stays fresh.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        match self {
            Self::OneDay => Duration::from_secs(60),
            Self::OneWeek => Duration::from_secs(5 * 60),
            Self::OneMonth => Duration::from_secs(15 * 60),
            Self::ThreeMonths => Duration::from_secs(30 * 60),
            Self::OneYear => Duration::from_secs(60 * 60),
        }
    }

    /// Short label used in URLs and cache keys.
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

impl std::str::FromStr for OhlcvRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            "1m" => Ok(Self::OneMonth),
            "3m" => Ok(Self::ThreeMonths),
            "1y" => Ok(Self::OneYear),
            _ => Err(format!(
                "Invalid range: {}. Use 1d, 1w, 1m, 3m, or 1y",
                s
            )),
        }
    }
}

/// A single candle as reported by Kraken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
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
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OhlcvSeries {
    /// Kraken pair name (e.g. "XXBTZUSD").
    pub pair: String,
    /// Candle interval in minutes.
    pub interval_minutes: u32,
    /// Candles, oldest first.
    pub candles: Vec<Candle>,
    /// Kraken's polling cursor.
    pub last: Option<i64>,
}

/// Machine-readable category of an OHLCV error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteErrorCode {
    /// Bad ticker or range.
    ValidationError,
    /// Non-success HTTP status from the upstream.
    HttpError,
    /// The upstream reported an error in its payload.
    ApiError,
    /// Timeouts, transport and decode failures.
    UnknownError,
    /// Some timeframes failed.
    PartialError,
}

impl std::fmt::Display for QuoteErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::HttpError => write!(f, "HTTP_ERROR"),
            Self::ApiError => write!(f, "API_ERROR"),
            Self::UnknownError => write!(f, "UNKNOWN_ERROR"),
            Self::PartialError => write!(f, "PARTIAL_ERROR"),
        }
    }
}

/// Error attached to an OHLCV result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuoteError {
    /// Human-readable message.
    pub message: String,
    /// Error category.
    pub code: QuoteErrorCode,
}

/// Outcome for one timeframe.
///
/// `data` and `error` both `None` means the upstream had no candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeframeResult {
    /// Series, when available.
    pub data: Option<OhlcvSeries>,
    /// Failure, when the timeframe could not be fetched.
    pub error: Option<QuoteError>,
}

/// Query parameters for the OHLCV endpoint.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct OhlcvQuery {
    /// Base asset ticker (e.g. "BTC").
    #[serde(default)]
    pub ticker: Option<String>,
    /// Range; all ranges when absent.
    #[serde(default)]
    pub range: Option<String>,
}

/// Response for a single range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OhlcvRangeResponse {
    /// Normalized ticker.
    pub ticker: String,
    /// Requested range.
    pub range: OhlcvRange,
    /// Series, or `None` when Kraken had no candles.
    pub data: Option<OhlcvSeries>,
}

/// Response covering every range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllTimeframesResponse {
    /// Normalized ticker.
    pub ticker: String,
    /// Per-range outcome keyed by range label.
    pub data: BTreeMap<String, TimeframeResult>,
    /// Set to `PARTIAL_ERROR` when some ranges failed.
    pub error: Option<QuoteError>,
}

/// OHLCV candle in the chart-friendly shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
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

/// Query parameters for the formatted OHLCV endpoint.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct FormattedOhlcvQuery {
    /// Base asset ticker (default "BTC").
    #[serde(default)]
    pub symbol: Option<String>,
    /// Range (default "1d").
    #[serde(default)]
    pub interval: Option<String>,
}

/// Formatted OHLCV response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
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

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option.
    #[default]
    Call,
    /// Put option.
    Put,
}

impl OptionType {
    /// Lowercase name used by the upstream API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            _ => Err(format!("Invalid option type: {}. Use call or put", s)),
        }
    }
}

/// Accepts either a JSON string or a JSON number, keeping the text form.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Option contract as listed by Alpaca.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptionContract {
    /// OCC symbol.
    pub symbol: String,
    /// Alpaca contract id.
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
    /// Strike price as reported.
    #[serde(default, deserialize_with = "string_or_number")]
    pub strike_price: Option<String>,
    /// Open interest as reported.
    #[serde(default, deserialize_with = "string_or_number")]
    pub open_interest: Option<String>,
    /// Date of the open interest figure.
    #[serde(default)]
    pub open_interest_date: Option<String>,
    /// Last close price as reported.
    #[serde(default, deserialize_with = "string_or_number")]
    pub close_price: Option<String>,
}

impl OptionContract {
    /// Open interest as a number; missing or unparsable counts as zero.
    #[must_use]
    pub fn open_interest_value(&self) -> u64 {
        self.open_interest
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(0, |v| v as u64)
    }
}

/// Query parameters for the high open-interest endpoint.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct OptionsQuery {
    /// Underlying ticker.
    #[serde(default)]
    pub ticker: Option<String>,
    /// `call` (default) or `put`.
    #[serde(default)]
    pub option_type: Option<String>,
}

/// Highest open-interest contracts per expiration window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
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
    pub failures: Vec<FailureDetail>,
}

// ============================================================================
// Cache
// ============================================================================

/// OHLCV cache counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
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
    /// `hits / (hits + misses)`, 0 before any read.
    pub hit_ratio: f64,
}
