//! Unit tests for the token metadata service.

use super::*;
use crate::fetch::{BackoffPolicy, RetryPolicy};
use mockito::{Matcher, Mock, ServerGuard};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Asset{i}")).collect()
}

fn service(url: String, chunk_size: usize) -> TokenMetaService {
    service_with_timeout(url, chunk_size, Duration::from_secs(5))
}

fn service_with_timeout(url: String, chunk_size: usize, timeout: Duration) -> TokenMetaService {
    let client = HeliusClient::new(Client::new(), url, timeout);
    let runner = BatchRunner::new(3, RetryPolicy::new(3, BackoffPolicy::from_millis(5, 20)));
    TokenMetaService::new(client, runner, chunk_size)
}

fn rpc_body(request_id: &str, ids: &[String]) -> String {
    let result: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "jsonrpc": "2.0", "id": request_id, "result": result }).to_string()
}

async fn mock_chunk(
    server: &mut ServerGuard,
    ordinal: usize,
    status: usize,
    body: String,
    hits: usize,
) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(
            json!({ "id": format!("investAssist-{ordinal}") }),
        ))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_parse_ids_missing() {
    let err = parse_ids(&json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Token IDs array is required");

    let err = parse_ids(&json!({ "ids": null })).unwrap_err();
    assert_eq!(err.to_string(), "Token IDs array is required");
}

#[test]
fn test_parse_ids_non_string_member() {
    let err = parse_ids(&json!({ "ids": ["a", 7] })).unwrap_err();
    assert_eq!(err.to_string(), "All token IDs must be strings");

    let err = parse_ids(&json!({ "ids": 42 })).unwrap_err();
    assert_eq!(err.to_string(), "All token IDs must be strings");
}

#[test]
fn test_parse_ids_empty() {
    let err = parse_ids(&json!({ "ids": [] })).unwrap_err();
    assert_eq!(err.to_string(), "At least one token ID is required");

    let err = parse_ids(&json!({ "ids": ["a", "  "] })).unwrap_err();
    assert_eq!(err.to_string(), "At least one token ID is required");
}

#[test]
fn test_parse_ids_accepts_single_string() {
    assert_eq!(parse_ids(&json!({ "ids": "Asset0" })).unwrap(), vec!["Asset0"]);
}

#[tokio::test]
async fn test_validation_happens_before_any_network_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;

    let body = json!({ "ids": [1, 2, 3] });
    let outcome = match parse_ids(&body) {
        Ok(ids) => service(server.url(), 100).fetch(&ids).await.map(|_| ()),
        Err(err) => Err(err),
    };

    assert!(matches!(outcome, Err(ApiError::InvalidRequest(_))));
    mock.assert_async().await;
}

// ============================================================================
// Batching
// ============================================================================

#[tokio::test]
async fn test_chunk_recovers_after_two_rate_limits() {
    let mut server = mockito::Server::new_async().await;
    let all = ids(250);

    let first = mock_chunk(&mut server, 0, 200, rpc_body("investAssist-0", &all[..100]), 1).await;
    let limited = mock_chunk(&mut server, 1, 429, "Rate limit exceeded".into(), 2).await;
    let recovered =
        mock_chunk(&mut server, 1, 200, rpc_body("investAssist-1", &all[100..200]), 1).await;
    let last = mock_chunk(&mut server, 2, 200, rpc_body("investAssist-2", &all[200..]), 1).await;

    let response = service(server.url(), 100).fetch(&all).await.unwrap();

    assert!(!response.partial);
    assert!(response.failures.is_empty());
    assert_eq!(response.jsonrpc, "2.0");
    assert_eq!(response.id, "investAssist");
    let returned: Vec<&str> = response
        .result
        .iter()
        .filter_map(|record| record["id"].as_str())
        .collect();
    assert_eq!(returned, all.iter().map(String::as_str).collect::<Vec<_>>());

    first.assert_async().await;
    limited.assert_async().await;
    recovered.assert_async().await;
    last.assert_async().await;
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_chunks() {
    let mut server = mockito::Server::new_async().await;
    let all = ids(30);

    mock_chunk(&mut server, 0, 200, rpc_body("investAssist-0", &all[..10]), 1).await;
    let bad = mock_chunk(&mut server, 1, 400, "bad request".into(), 1).await;
    mock_chunk(&mut server, 2, 200, rpc_body("investAssist-2", &all[20..]), 1).await;

    let response = service(server.url(), 10).fetch(&all).await.unwrap();

    assert!(response.partial);
    assert_eq!(response.result.len(), 20);
    assert_eq!(response.result[10]["id"], "Asset20");
    assert_eq!(response.failures.len(), 1);
    assert_eq!(response.failures[0].label, "chunk 2 (10 ids)");
    assert_eq!(response.failures[0].attempts, 1);
    assert!(!response.failures[0].exhausted);
    assert_eq!(response.failures[0].index, 1);
    assert_eq!(response.failures[0].offset, Some(10));
    assert_eq!(response.failures[0].ids, all[10..20].to_vec());
    bad.assert_async().await;
}

#[tokio::test]
async fn test_complete_failure_is_aggregate_error() {
    let mut server = mockito::Server::new_async().await;
    let throttled = server
        .mock("POST", "/")
        .with_status(503)
        .with_body("unavailable")
        .expect(6)
        .create_async()
        .await;

    let err = service(server.url(), 100).fetch(&ids(150)).await.unwrap_err();

    match err {
        ApiError::AggregateFailure { message, failures } => {
            assert!(message.contains("all 2 chunks failed"));
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().all(|f| f.exhausted && f.attempts == 3));
            assert_eq!(failures[1].offset, Some(100));
            assert_eq!(failures[1].ids.len(), 50);
            assert_eq!(failures[1].ids[0], "Asset100");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    throttled.assert_async().await;
}

// ============================================================================
// Network failures
// ============================================================================

#[tokio::test]
async fn test_timed_out_attempts_are_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    let server = tokio::spawn(async move {
        // Hold every connection open without answering.
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    let err = service_with_timeout(url, 100, Duration::from_millis(100))
        .fetch(&ids(3))
        .await
        .unwrap_err();
    server.abort();

    match err {
        ApiError::AggregateFailure { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].reason, "upstream request timed out");
            assert_eq!(failures[0].attempts, 3);
            assert!(failures[0].exhausted);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_refused_connection_is_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let err = service(url, 100).fetch(&ids(3)).await.unwrap_err();

    match err {
        ApiError::AggregateFailure { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].reason.starts_with("transport error"));
            assert_eq!(failures[0].attempts, 3);
            assert!(failures[0].exhausted);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
