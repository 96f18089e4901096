//! # Market Data Gateway - REST API Server
//!
//! An HTTP gateway that proxies three upstream market-data APIs through one
//! resilient batch fetch core. Built with [Axum](https://crates.io/crates/axum)
//! and documented with [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: every call site fans its work items out through
//!   a [`fetch::BatchRunner`] with a configurable in-flight limit.
//!
//! - **Retries with backoff**: transient upstream failures (429, 5xx,
//!   timeouts, rate-limit RPC codes) are retried with capped exponential
//!   backoff; terminal failures are not.
//!
//! - **Partial results**: a batch in which some items failed still answers
//!   200 with the successful items and a per-item failure list.
//!
//! - **Read-through cache**: OHLCV series are cached per ticker and range
//!   with a range-specific TTL.
//!
//! - **OpenAPI Documentation**: Swagger UI at `/swagger-ui/`.
//!
//! ## Architecture
//!
//! ```text
//! handler ──► service ──► BatchRunner ──► RetryPolicy ──► upstream client
//!                │                                          (Helius, Kraken, Alpaca)
//!                └──► aggregate() ──► response / ApiError
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers and router configuration |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`fetch`] | Backoff, retry, batch runner, aggregator and cache |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`ohlc`] | Kraken row parsing and candle formatting |
//! | [`services`] | Token metadata, OHLCV and options call sites |
//! | [`state`] | Application state management |
//! | [`upstream`] | HTTP clients for the upstream APIs |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/tokens/metadata` | Token metadata via Helius `getAssetBatch` |
//! | GET | `/api/v1/ohlcv?ticker=&range=` | OHLCV for one range, or all ranges |
//! | GET | `/api/v1/ohlcv/formatted?symbol=&interval=` | Chart-friendly candles |
//! | GET | `/api/v1/options/high-open-interest?ticker=&option_type=` | Best contracts by open interest |
//! | GET | `/api/v1/cache/stats` | OHLCV cache counters |
//!
//! ## Example Usage
//!
//! ```bash
//! # Start with the bundled configuration
//! CONFIG_PATH=config/default.toml cargo run
//!
//! # Token metadata
//! curl -X POST http://localhost:8080/api/v1/tokens/metadata \
//!   -H "Content-Type: application/json" \
//!   -d '{"ids": ["So11111111111111111111111111111111111111112"]}'
//!
//! # Every OHLCV range for BTC
//! curl "http://localhost:8080/api/v1/ohlcv?ticker=BTC"
//!
//! # Highest open-interest puts for AAPL
//! curl "http://localhost:8080/api/v1/options/high-open-interest?ticker=AAPL&option_type=put"
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod ohlc;
pub mod services;
pub mod state;
pub mod upstream;
