//! Unit tests for the OHLCV service.

use super::*;
use crate::fetch::{BackoffPolicy, RetryPolicy, TtlCache};
use mockito::{Matcher, Mock, ServerGuard};
use reqwest::Client;
use std::time::Duration;

fn service(url: &str, cache: Option<SeriesCache>) -> OhlcvService {
    let client = KrakenClient::new(Client::new(), url, Duration::from_secs(5));
    let runner = BatchRunner::new(5, RetryPolicy::new(3, BackoffPolicy::from_millis(5, 20)));
    OhlcvService::new(client, runner, cache)
}

fn cache() -> SeriesCache {
    Arc::new(TtlCache::new(16))
}

fn series_body(rows: usize) -> String {
    let rows: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"[{},"100.0","110.0","95.0","105.0","102.5","{}.5",{}]"#,
                1704067200 + i * 60,
                i + 1,
                i + 3
            )
        })
        .collect();
    format!(
        r#"{{"error":[],"result":{{"XXBTZUSD":[{}],"last":1704067200}}}}"#,
        rows.join(",")
    )
}

async fn mock_interval(
    server: &mut ServerGuard,
    interval: u32,
    status: usize,
    body: String,
    hits: usize,
) -> Mock {
    server
        .mock("GET", "/0/public/OHLC")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pair".into(), "BTCUSD".into()),
            Matcher::UrlEncoded("interval".into(), interval.to_string()),
        ]))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

// ============================================================================
// Single range
// ============================================================================

#[tokio::test]
async fn test_fetch_range_normalizes_candles() {
    let mut server = mockito::Server::new_async().await;
    mock_interval(&mut server, 60, 200, series_body(3), 1).await;

    let series = service(&server.url(), None)
        .fetch_range("BTC", OhlcvRange::OneMonth)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(series.pair, "XXBTZUSD");
    assert_eq!(series.interval_minutes, 60);
    assert_eq!(series.candles.len(), 3);
    assert_eq!(series.candles[2].volume, 3.5);
    assert_eq!(series.candles[2].trade_count, 5);
}

#[tokio::test]
async fn test_fetch_range_retries_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let failing = mock_interval(&mut server, 1, 500, "oops".into(), 2).await;
    let ok = mock_interval(&mut server, 1, 200, series_body(1), 1).await;

    let series = service(&server.url(), None)
        .fetch_range("BTC", OhlcvRange::OneDay)
        .await
        .unwrap();

    assert!(series.is_some());
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_unknown_pair_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_interval(
        &mut server,
        1,
        200,
        r#"{"error":["EQuery:Unknown asset pair"]}"#.into(),
        1,
    )
    .await;

    let failure = service(&server.url(), None)
        .fetch_range("BTC", OhlcvRange::OneDay)
        .await
        .unwrap_err();

    assert_eq!(failure.attempts, 1);
    assert_eq!(failure.last_error.quote_code(), QuoteErrorCode::ApiError);
    mock.assert_async().await;
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_second_read_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_interval(&mut server, 15, 200, series_body(2), 1).await;
    let svc = service(&server.url(), Some(cache()));

    let first = svc.fetch_range("BTC", OhlcvRange::OneWeek).await.unwrap();
    let second = svc.fetch_range("BTC", OhlcvRange::OneWeek).await.unwrap();

    assert_eq!(first, second);
    let stats = svc.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_series_is_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_interval(&mut server, 1440, 200, series_body(0), 2).await;
    let svc = service(&server.url(), Some(cache()));

    assert!(svc.fetch_range("BTC", OhlcvRange::OneYear).await.unwrap().is_none());
    assert!(svc.fetch_range("BTC", OhlcvRange::OneYear).await.unwrap().is_none());

    assert_eq!(svc.cache_stats().unwrap().entries, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cache_disabled_reports_no_stats() {
    let svc = service("http://127.0.0.1:9", None);
    assert!(svc.cache_stats().is_none());
}

// ============================================================================
// All timeframes
// ============================================================================

#[tokio::test]
async fn test_all_timeframes_partial_failure() {
    let mut server = mockito::Server::new_async().await;
    mock_interval(&mut server, 1, 200, series_body(2), 1).await;
    mock_interval(&mut server, 15, 200, series_body(0), 1).await;
    mock_interval(&mut server, 60, 200, series_body(2), 1).await;
    mock_interval(&mut server, 240, 404, "not found".into(), 1).await;
    mock_interval(&mut server, 1440, 200, series_body(2), 1).await;

    let response = service(&server.url(), None)
        .fetch_all_timeframes("BTC")
        .await
        .unwrap();

    assert_eq!(response.data.len(), 5);
    assert_eq!(
        response.error,
        Some(QuoteError {
            message: "Some timeframes failed to load".to_string(),
            code: QuoteErrorCode::PartialError,
        })
    );

    let empty = &response.data["1w"];
    assert!(empty.data.is_none());
    assert!(empty.error.is_none());

    let failed = &response.data["3m"];
    assert!(failed.data.is_none());
    assert_eq!(failed.error.as_ref().unwrap().code, QuoteErrorCode::HttpError);

    assert_eq!(response.data["1d"].data.as_ref().unwrap().candles.len(), 2);
}

#[tokio::test]
async fn test_all_timeframes_without_candles_is_success() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/0/public/OHLC")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(series_body(0))
        .expect(5)
        .create_async()
        .await;

    let response = service(&server.url(), None)
        .fetch_all_timeframes("BTC")
        .await
        .unwrap();

    assert!(response.error.is_none());
    assert!(response.data.values().all(|t| t.data.is_none() && t.error.is_none()));
}

#[tokio::test]
async fn test_all_timeframes_complete_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/0/public/OHLC")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error":["EQuery:Unknown asset pair"]}"#)
        .expect(5)
        .create_async()
        .await;

    let err = service(&server.url(), None)
        .fetch_all_timeframes("BTC")
        .await
        .unwrap_err();

    match err {
        ApiError::AggregateFailure { message, failures } => {
            assert_eq!(message, "Failed to fetch data for all timeframes");
            let labels: Vec<&str> = failures.iter().map(|f| f.label.as_str()).collect();
            assert_eq!(labels, vec!["1d", "1w", "1m", "3m", "1y"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Formatted
// ============================================================================

#[tokio::test]
async fn test_formatted_candles() {
    let mut server = mockito::Server::new_async().await;
    mock_interval(&mut server, 1, 200, series_body(2), 1).await;

    let response = service(&server.url(), None)
        .formatted("BTC", OhlcvRange::OneDay)
        .await
        .unwrap();

    assert_eq!(response.source, "kraken");
    assert_eq!(response.interval, OhlcvRange::OneDay);
    assert_eq!(response.data.len(), 2);
    assert_eq!(response.data[0].timestamp, 1704067200);
    assert_eq!(response.data[0].volume, 1.5);
}

#[tokio::test]
async fn test_formatted_maps_upstream_failure() {
    let mut server = mockito::Server::new_async().await;
    mock_interval(&mut server, 1, 400, "bad".into(), 1).await;

    let err = service(&server.url(), None)
        .formatted("BTC", OhlcvRange::OneDay)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Upstream {
            code: QuoteErrorCode::HttpError,
            ..
        }
    ));
}
