//! Route configuration.

use crate::api::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Token metadata
        .route("/api/v1/tokens/metadata", post(handlers::token_metadata))
        // OHLCV
        .route("/api/v1/ohlcv", get(handlers::get_ohlcv))
        .route("/api/v1/ohlcv/formatted", get(handlers::get_formatted_ohlcv))
        // Options
        .route(
            "/api/v1/options/high-open-interest",
            get(handlers::get_high_open_interest),
        )
        // Cache
        .route("/api/v1/cache/stats", get(handlers::get_cache_stats))
        .with_state(state)
}
