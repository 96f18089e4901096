//! OHLC (Open, High, Low, Close) candle normalization.
//!
//! Kraken encodes each candle as a positional array with prices as strings:
//! `[time, open, high, low, close, vwap, volume, count]`. This module turns
//! those rows into typed [`Candle`]s and the chart-friendly
//! [`FormattedCandle`] shape.

use crate::models::{Candle, FormattedCandle};
use serde::{Deserialize, Serialize};

/// One raw Kraken OHLC row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KrakenRow(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub u64,
);

/// Error raised when a row carries a non-numeric price or volume.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} '{value}' in candle at {timestamp}")]
pub struct CandleParseError {
    /// Column name.
    pub field: &'static str,
    /// Raw text.
    pub value: String,
    /// Candle timestamp.
    pub timestamp: i64,
}

fn parse_price(field: &'static str, raw: &str, timestamp: i64) -> Result<f64, CandleParseError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CandleParseError {
            field,
            value: raw.to_string(),
            timestamp,
        })
}

impl KrakenRow {
    /// Converts the row into a [`Candle`].
    ///
    /// # Errors
    /// Returns [`CandleParseError`] if any numeric column is malformed.
    pub fn to_candle(&self) -> Result<Candle, CandleParseError> {
        let ts = self.0;
        Ok(Candle {
            timestamp: ts,
            open: parse_price("open", &self.1, ts)?,
            high: parse_price("high", &self.2, ts)?,
            low: parse_price("low", &self.3, ts)?,
            close: parse_price("close", &self.4, ts)?,
            vwap: parse_price("vwap", &self.5, ts)?,
            volume: parse_price("volume", &self.6, ts)?,
            trade_count: self.7,
        })
    }
}

/// Converts a full series of rows, failing on the first malformed one.
///
/// # Errors
/// Returns [`CandleParseError`] for the first malformed row.
pub fn rows_to_candles(rows: &[KrakenRow]) -> Result<Vec<Candle>, CandleParseError> {
    rows.iter().map(KrakenRow::to_candle).collect()
}

impl From<Candle> for FormattedCandle {
    fn from(candle: Candle) -> Self {
        Self {
            timestamp: candle.timestamp,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
        }
    }
}

/// Projects candles onto the chart-friendly shape, oldest first.
#[must_use]
pub fn format_candles(candles: &[Candle]) -> Vec<FormattedCandle> {
    let mut formatted: Vec<FormattedCandle> =
        candles.iter().copied().map(FormattedCandle::from).collect();
    formatted.sort_by_key(|c| c.timestamp);
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: i64, open: &str, close: &str) -> KrakenRow {
        KrakenRow(
            ts,
            open.to_string(),
            "105.5".to_string(),
            "99.25".to_string(),
            close.to_string(),
            "101.0".to_string(),
            "12.5".to_string(),
            42,
        )
    }

    #[test]
    fn test_row_deserializes_from_kraken_array() {
        let json = r#"[1704067200, "42000.1", "42100.0", "41900.5", "42050.0", "42010.3", "3.25", 17]"#;
        let row: KrakenRow = serde_json::from_str(json).unwrap();
        let candle = row.to_candle().unwrap();

        assert_eq!(candle.timestamp, 1704067200);
        assert_eq!(candle.open, 42000.1);
        assert_eq!(candle.high, 42100.0);
        assert_eq!(candle.low, 41900.5);
        assert_eq!(candle.close, 42050.0);
        assert_eq!(candle.vwap, 42010.3);
        assert_eq!(candle.volume, 3.25);
        assert_eq!(candle.trade_count, 17);
    }

    #[test]
    fn test_malformed_price_is_reported() {
        let err = row(1704067200, "n/a", "100").to_candle().unwrap_err();
        assert_eq!(err.field, "open");
        assert_eq!(err.value, "n/a");
        assert_eq!(err.timestamp, 1704067200);
    }

    #[test]
    fn test_rows_to_candles_stops_at_first_bad_row() {
        let rows = vec![
            row(1, "100", "101"),
            row(2, "101", "oops"),
            row(3, "102", "103"),
        ];
        let err = rows_to_candles(&rows).unwrap_err();
        assert_eq!(err.timestamp, 2);
        assert_eq!(err.field, "close");
    }

    #[test]
    fn test_format_candles_uses_volume_column() {
        let candles = rows_to_candles(&[row(60, "100", "101")]).unwrap();
        let formatted = format_candles(&candles);

        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].timestamp, 60);
        assert_eq!(formatted[0].open, 100.0);
        assert_eq!(formatted[0].close, 101.0);
        assert_eq!(formatted[0].volume, 12.5);
    }

    #[test]
    fn test_format_candles_sorted_oldest_first() {
        let candles = rows_to_candles(&[row(180, "1", "1"), row(60, "1", "1"), row(120, "1", "1")])
            .unwrap();
        let timestamps: Vec<i64> = format_candles(&candles)
            .iter()
            .map(|c| c.timestamp)
            .collect();
        assert_eq!(timestamps, vec![60, 120, 180]);
    }

    #[test]
    fn test_format_empty_series() {
        assert!(format_candles(&[]).is_empty());
    }
}
