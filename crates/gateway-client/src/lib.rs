//! HTTP client library for the Market Data Gateway API.
//!
//! This crate provides a typed HTTP client for the gateway's REST endpoints:
//! token metadata, OHLCV, high open-interest options and cache statistics.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{ClientConfig, GatewayClient, OhlcvRange};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_client::Error> {
//!     let client = GatewayClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     let daily = client.get_ohlcv("BTC", OhlcvRange::OneDay).await?;
//!     println!("{} candles", daily.data.map(|s| s.candles.len()).unwrap_or(0));
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientConfig, GatewayClient};
pub use error::Error;
pub use types::*;
