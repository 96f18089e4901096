//! API request handlers.

use crate::error::{AggregateErrorResponse, ApiError, ErrorResponse};
use crate::models::{
    AllTimeframesResponse, CacheStatsResponse, FormattedOhlcvQuery, FormattedOhlcvResponse,
    HealthResponse, HighOpenInterestResponse, OhlcvQuery, OhlcvRange, OhlcvRangeResponse,
    OptionType, OptionsQuery, TokenMetadataRequest, TokenMetadataResponse,
};
use crate::services::normalize_ticker;
use crate::services::token_meta::parse_ids;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_SYMBOL: &str = "BTC";

fn parse_range(raw: &str) -> Result<OhlcvRange, ApiError> {
    raw.trim().parse().map_err(ApiError::InvalidRequest)
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Token Metadata
// ============================================================================

/// Fetch token metadata in chunks from Helius.
///
/// Returns 200 with `partial = true` when only some chunks failed.
#[utoipa::path(
    post,
    path = "/api/v1/tokens/metadata",
    request_body = TokenMetadataRequest,
    responses(
        (status = 200, description = "Metadata for every chunk that succeeded", body = TokenMetadataResponse),
        (status = 400, description = "Invalid token IDs", body = ErrorResponse),
        (status = 500, description = "Every chunk failed", body = AggregateErrorResponse)
    ),
    tag = "Tokens"
)]
pub async fn token_metadata(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenMetadataResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let ids = parse_ids(&body)?;
    let response = state.token_meta.fetch(&ids).await?;
    Ok(Json(response))
}

// ============================================================================
// OHLCV
// ============================================================================

/// Get OHLCV data for one range, or for every range when `range` is omitted.
#[utoipa::path(
    get,
    path = "/api/v1/ohlcv",
    params(
        ("ticker" = String, Query, description = "Base asset ticker, e.g. BTC"),
        ("range" = Option<String>, Query, description = "Range: 1d, 1w, 1m, 3m or 1y; all ranges when omitted")
    ),
    responses(
        (status = 200, description = "Series for the requested range", body = OhlcvRangeResponse),
        (status = 200, description = "Series for every range", body = AllTimeframesResponse),
        (status = 400, description = "Invalid ticker or range", body = ErrorResponse),
        (status = 500, description = "Every range failed", body = AggregateErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    ),
    tag = "OHLCV"
)]
pub async fn get_ohlcv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OhlcvQuery>,
) -> Result<Response, ApiError> {
    let ticker = normalize_ticker(query.ticker.as_deref(), "ticker")?;

    match query.range.as_deref() {
        Some(raw) => {
            let range = parse_range(raw)?;
            let data = state.ohlcv.fetch_range(&ticker, range).await?;
            Ok(Json(OhlcvRangeResponse {
                ticker,
                range,
                data,
            })
            .into_response())
        }
        None => {
            let response = state.ohlcv.fetch_all_timeframes(&ticker).await?;
            Ok(Json(response).into_response())
        }
    }
}

/// Get chart-friendly candles for one range.
#[utoipa::path(
    get,
    path = "/api/v1/ohlcv/formatted",
    params(
        ("symbol" = Option<String>, Query, description = "Base asset ticker (default BTC)"),
        ("interval" = Option<String>, Query, description = "Range: 1d (default), 1w, 1m, 3m or 1y")
    ),
    responses(
        (status = 200, description = "Formatted candles", body = FormattedOhlcvResponse),
        (status = 400, description = "Invalid symbol or interval", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    ),
    tag = "OHLCV"
)]
pub async fn get_formatted_ohlcv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormattedOhlcvQuery>,
) -> Result<Json<FormattedOhlcvResponse>, ApiError> {
    let symbol = normalize_ticker(
        Some(query.symbol.as_deref().unwrap_or(DEFAULT_SYMBOL)),
        "symbol",
    )?;
    let range = match query.interval.as_deref() {
        Some(raw) => parse_range(raw)?,
        None => OhlcvRange::OneDay,
    };
    let response = state.ohlcv.formatted(&symbol, range).await?;
    Ok(Json(response))
}

// ============================================================================
// Options
// ============================================================================

/// Get the highest open-interest contract for the short-term and LEAP windows.
#[utoipa::path(
    get,
    path = "/api/v1/options/high-open-interest",
    params(
        ("ticker" = String, Query, description = "Underlying ticker"),
        ("option_type" = Option<String>, Query, description = "call (default) or put")
    ),
    responses(
        (status = 200, description = "Best contract per window", body = HighOpenInterestResponse),
        (status = 400, description = "Invalid ticker or option type", body = ErrorResponse),
        (status = 500, description = "Every window failed", body = AggregateErrorResponse)
    ),
    tag = "Options"
)]
pub async fn get_high_open_interest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<HighOpenInterestResponse>, ApiError> {
    let ticker = normalize_ticker(query.ticker.as_deref(), "ticker")?;
    let option_type = match query.option_type.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<OptionType>()
            .map_err(ApiError::InvalidRequest)?,
        None => OptionType::default(),
    };
    let today = chrono::Utc::now().date_naive();
    let response = state
        .options
        .high_open_interest(&ticker, option_type, today)
        .await?;
    Ok(Json(response))
}

// ============================================================================
// Cache
// ============================================================================

/// Get OHLCV cache counters.
#[utoipa::path(
    get,
    path = "/api/v1/cache/stats",
    responses(
        (status = 200, description = "Cache counters", body = CacheStatsResponse),
        (status = 404, description = "Caching is disabled", body = ErrorResponse)
    ),
    tag = "Cache"
)]
pub async fn get_cache_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CacheStatsResponse>, ApiError> {
    let stats = state
        .ohlcv
        .cache_stats()
        .ok_or_else(|| ApiError::NotFound("OHLCV cache is disabled".to_string()))?;
    let reads = stats.hits + stats.misses;
    let hit_ratio = if reads == 0 {
        0.0
    } else {
        stats.hits as f64 / reads as f64
    };
    Ok(Json(CacheStatsResponse {
        entries: stats.entries,
        max_entries: stats.max_entries,
        hits: stats.hits,
        misses: stats.misses,
        evictions: stats.evictions,
        hit_ratio,
    }))
}
