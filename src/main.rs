//! Market Data Gateway Server
//!
//! REST API server proxying Helius, Kraken and Alpaca market data.

use market_data_gateway::api::create_router;
use market_data_gateway::config::Config;
use market_data_gateway::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use market_data_gateway::error::{AggregateErrorResponse, ErrorResponse};
use market_data_gateway::models::{
    AllTimeframesResponse, CacheStatsResponse, Candle, FailureDetail, FormattedCandle,
    FormattedOhlcvResponse, HealthResponse, HighOpenInterestResponse, OhlcvRange,
    OhlcvRangeResponse, OhlcvSeries, OptionContract, OptionType, QuoteError, QuoteErrorCode,
    TimeframeResult, TokenMetadataRequest, TokenMetadataResponse,
};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        market_data_gateway::api::handlers::health_check,
        market_data_gateway::api::handlers::token_metadata,
        market_data_gateway::api::handlers::get_ohlcv,
        market_data_gateway::api::handlers::get_formatted_ohlcv,
        market_data_gateway::api::handlers::get_high_open_interest,
        market_data_gateway::api::handlers::get_cache_stats,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            AggregateErrorResponse,
            FailureDetail,
            TokenMetadataRequest,
            TokenMetadataResponse,
            OhlcvRange,
            Candle,
            OhlcvSeries,
            QuoteError,
            QuoteErrorCode,
            TimeframeResult,
            OhlcvRangeResponse,
            AllTimeframesResponse,
            FormattedCandle,
            FormattedOhlcvResponse,
            OptionType,
            OptionContract,
            HighOpenInterestResponse,
            CacheStatsResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Tokens", description = "Token metadata from Helius"),
        (name = "OHLCV", description = "Candles from Kraken"),
        (name = "Options", description = "Option contracts from Alpaca"),
        (name = "Cache", description = "OHLCV cache counters"),
    ),
    info(
        title = "Market Data Gateway API",
        version = "0.1.0",
        description = "Resilient batched access to token, OHLCV and options market data",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create application state
    let state = Arc::new(AppState::from_config(config));

    info!("Starting Market Data Gateway on {}:{}", host, port);
    info!("Swagger UI available at http://{}:{}/swagger-ui/", host, port);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
