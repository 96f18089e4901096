//! Integration test harness for the Market Data Gateway API.
//!
//! Each test starts the router in-process on an ephemeral port, with every
//! upstream pointed at a mock server, and drives it through
//! [`gateway_client::GatewayClient`].

use gateway_client::{ClientConfig, GatewayClient};
use market_data_gateway::api::create_router;
use market_data_gateway::config::{Config, FetchSettings};
use market_data_gateway::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Path the Helius JSON-RPC mock listens on.
pub const HELIUS_PATH: &str = "/rpc";

fn fast(mut settings: FetchSettings) -> FetchSettings {
    settings.base_delay_ms = 5;
    settings.backoff_cap_ms = 20;
    settings.timeout_ms = 2_000;
    settings
}

/// Configuration with every upstream at `upstream_url` and short backoffs.
#[must_use]
pub fn test_config(upstream_url: &str) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.upstream.helius_rpc_url = format!("{upstream_url}{HELIUS_PATH}");
    config.upstream.kraken_base_url = upstream_url.to_string();
    config.upstream.alpaca_base_url = upstream_url.to_string();
    config.upstream.alpaca_key_id = "test-key".to_string();
    config.upstream.alpaca_secret_key = "test-secret".to_string();
    config.token_meta = fast(config.token_meta);
    config.ohlcv = fast(config.ohlcv);
    config.options = fast(config.options);
    config
}

/// Starts the gateway with `config` and returns a client bound to it.
///
/// The server runs until the test's runtime shuts down.
///
/// # Errors
/// Returns error if the listener cannot be bound or the client cannot be built.
pub async fn spawn_gateway(config: Config) -> anyhow::Result<GatewayClient> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(Arc::new(AppState::from_config(config)));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(GatewayClient::new(ClientConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(10),
    })?)
}

/// Kraken OHLC body with `rows` one-minute candles for XXBTZUSD.
#[must_use]
pub fn kraken_body(rows: usize) -> String {
    let rows: Vec<serde_json::Value> = (0..rows)
        .map(|i| {
            serde_json::json!([
                1_704_067_200 + 60 * i as i64,
                "100.0",
                "110.0",
                "95.0",
                "105.0",
                "102.5",
                "2.5",
                7
            ])
        })
        .collect();
    serde_json::json!({
        "error": [],
        "result": { "XXBTZUSD": rows, "last": 1_704_067_200 }
    })
    .to_string()
}
