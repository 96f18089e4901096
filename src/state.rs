//! Application state management.

use crate::config::Config;
use crate::fetch::TtlCache;
use crate::models::OhlcvSeries;
use crate::services::ohlcv::{SeriesCache, SeriesKey};
use crate::services::{OhlcvService, OptionsService, TokenMetaService};
use crate::upstream::{AlpacaClient, HeliusClient, KrakenClient};
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Helius token metadata call site.
    pub token_meta: TokenMetaService,
    /// Kraken OHLCV call site.
    pub ohlcv: OhlcvService,
    /// Alpaca options call site.
    pub options: OptionsService,
}

impl AppState {
    /// Creates the state from configuration with a fresh HTTP client.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self::with_http_client(config, Client::new())
    }

    /// Creates the state from configuration, sharing `http` between all
    /// upstream clients.
    #[must_use]
    pub fn with_http_client(config: Config, http: Client) -> Self {
        let upstream = &config.upstream;

        let helius = HeliusClient::new(
            http.clone(),
            upstream.helius_rpc_url.clone(),
            config.token_meta.timeout(),
        );
        let token_meta = TokenMetaService::new(
            helius,
            config.token_meta.runner(),
            config.token_meta.chunk_size,
        );

        let kraken = KrakenClient::new(http.clone(), &upstream.kraken_base_url, config.ohlcv.timeout());
        let cache: Option<SeriesCache> = if config.cache.enabled {
            let cache: TtlCache<SeriesKey, OhlcvSeries> = if config.cache.max_entries == 0 {
                TtlCache::unbounded()
            } else {
                TtlCache::new(config.cache.max_entries)
            };
            Some(Arc::new(cache))
        } else {
            None
        };
        let ohlcv = OhlcvService::new(kraken, config.ohlcv.runner(), cache);

        let alpaca = if upstream.alpaca_key_id.is_empty() || upstream.alpaca_secret_key.is_empty() {
            warn!("Alpaca credentials missing; options endpoint disabled");
            None
        } else {
            Some(AlpacaClient::new(
                http,
                &upstream.alpaca_base_url,
                upstream.alpaca_key_id.clone(),
                upstream.alpaca_secret_key.clone(),
                config.options.timeout(),
            ))
        };
        let options = OptionsService::new(alpaca, config.options.runner());

        info!(
            cache_enabled = config.cache.enabled,
            cache_max_entries = config.cache.max_entries,
            "application state initialized"
        );

        Self {
            config: Arc::new(config),
            token_meta,
            ohlcv,
            options,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_has_cache() {
        let state = AppState::default();
        let stats = state.ohlcv.cache_stats().unwrap();
        assert_eq!(stats.max_entries, 1024);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn test_disabled_cache() {
        let mut config = Config::default();
        config.cache.enabled = false;
        let state = AppState::from_config(config);
        assert!(state.ohlcv.cache_stats().is_none());
    }

    #[test]
    fn test_unbounded_cache() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        let state = AppState::from_config(config);
        assert_eq!(state.ohlcv.cache_stats().unwrap().max_entries, 0);
    }
}
