//! Configuration module for loading and parsing TOML configuration files.
//!
//! Every section is optional; a missing section takes the defaults for its
//! call site. Fields omitted inside a present `[token_meta]`, `[ohlcv]` or
//! `[options]` section take the generic [`FetchSettings::default`] values.

use crate::fetch::{BackoffPolicy, BatchRunner, RetryPolicy};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream endpoints and credentials.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Token metadata call site.
    #[serde(default = "FetchSettings::token_meta")]
    pub token_meta: FetchSettings,
    /// OHLCV call site.
    #[serde(default = "FetchSettings::ohlcv")]
    pub ohlcv: FetchSettings,
    /// Options call site.
    #[serde(default = "FetchSettings::options")]
    pub options: FetchSettings,
    /// OHLCV cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream base URLs and credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Helius RPC endpoint, including the API key query parameter.
    pub helius_rpc_url: String,
    /// Kraken REST base URL.
    pub kraken_base_url: String,
    /// Alpaca REST base URL.
    pub alpaca_base_url: String,
    /// Alpaca API key id.
    pub alpaca_key_id: String,
    /// Alpaca API secret.
    pub alpaca_secret_key: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            helius_rpc_url: "https://mainnet.helius-rpc.com/".to_string(),
            kraken_base_url: "https://api.kraken.com".to_string(),
            alpaca_base_url: "https://api.alpaca.markets".to_string(),
            alpaca_key_id: String::new(),
            alpaca_secret_key: String::new(),
        }
    }
}

/// Retry, backoff and concurrency knobs for one call site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts per work item, including the first.
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub backoff_cap_ms: u64,
    /// Identifiers per upstream request (token metadata only).
    pub chunk_size: usize,
    /// Work items in flight at once.
    pub max_concurrent: usize,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Randomize delays into `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            backoff_cap_ms: 5000,
            chunk_size: 100,
            max_concurrent: 3,
            timeout_ms: 15_000,
            jitter: false,
        }
    }
}

impl FetchSettings {
    /// Defaults for the token metadata call site.
    #[must_use]
    pub fn token_meta() -> Self {
        Self::default()
    }

    /// Defaults for the OHLCV call site: one slot per range.
    #[must_use]
    pub fn ohlcv() -> Self {
        Self {
            base_delay_ms: 1000,
            max_concurrent: 5,
            ..Self::default()
        }
    }

    /// Defaults for the options call site: one slot per expiration window.
    #[must_use]
    pub fn options() -> Self {
        Self {
            max_concurrent: 2,
            ..Self::default()
        }
    }

    /// Backoff schedule described by these settings.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::from_millis(self.base_delay_ms, self.backoff_cap_ms).with_jitter(self.jitter)
    }

    /// Retry policy described by these settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff())
    }

    /// Batch runner described by these settings.
    #[must_use]
    pub fn runner(&self) -> BatchRunner {
        BatchRunner::new(self.max_concurrent, self.retry_policy())
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{section}.max_retries must be positive"
            )));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{section}.max_concurrent must be positive"
            )));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{section}.chunk_size must be positive"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{section}.timeout_ms must be positive"
            )));
        }
        if self.base_delay_ms > self.backoff_cap_ms {
            return Err(ConfigError::InvalidValue(format!(
                "{section}.base_delay_ms ({}) exceeds backoff_cap_ms ({})",
                self.base_delay_ms, self.backoff_cap_ms
            )));
        }
        Ok(())
    }
}

/// OHLCV cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether fetched series are cached at all.
    pub enabled: bool,
    /// Maximum number of cached series, 0 for unbounded.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            token_meta: FetchSettings::token_meta(),
            ohlcv: FetchSettings::ohlcv(),
            options: FetchSettings::options(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads `path` if it exists, otherwise starts from the defaults, then
    /// applies environment overrides and validates.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be parsed or a value is invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_or_default_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load_or_default`], reading overrides from `lookup`.
    ///
    /// The file is validated only once the overrides are applied, so an
    /// override can replace an invalid file value.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be parsed or a value is invalid.
    pub fn load_or_default_with<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.as_ref().exists() {
            Self::read(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `HOST`, `PORT`, `HELIUS_RPC_URL`, `ALPACA_API_KEY_ID` and
    /// `ALPACA_API_SECRET_KEY` from `lookup`.
    ///
    /// # Errors
    /// Returns error if `PORT` is not a valid port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT '{port}' is not a port")))?;
        }
        if let Some(url) = lookup("HELIUS_RPC_URL") {
            self.upstream.helius_rpc_url = url;
        }
        if let Some(key) = lookup("ALPACA_API_KEY_ID") {
            self.upstream.alpaca_key_id = key;
        }
        if let Some(secret) = lookup("ALPACA_API_SECRET_KEY") {
            self.upstream.alpaca_secret_key = secret;
        }
        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "server.host cannot be empty".to_string(),
            ));
        }

        for (name, url) in [
            ("upstream.helius_rpc_url", &self.upstream.helius_rpc_url),
            ("upstream.kraken_base_url", &self.upstream.kraken_base_url),
            ("upstream.alpaca_base_url", &self.upstream.alpaca_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        self.token_meta.validate("token_meta")?;
        self.ohlcv.validate("ohlcv")?;
        self.options.validate("options")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 3000

[upstream]
helius_rpc_url = "https://rpc.example.com/?api-key=abc"
kraken_base_url = "https://kraken.example.com"

[token_meta]
max_retries = 4
base_delay_ms = 250
backoff_cap_ms = 4000
chunk_size = 50
max_concurrent = 2
timeout_ms = 2000
jitter = true

[cache]
max_entries = 16
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.kraken_base_url, "https://kraken.example.com");
        assert_eq!(config.upstream.alpaca_base_url, "https://api.alpaca.markets");
        assert_eq!(config.token_meta.chunk_size, 50);
        assert!(config.token_meta.jitter);
        assert_eq!(config.token_meta.retry_policy().max_retries, 4);
        assert_eq!(config.token_meta.runner().max_concurrent(), 2);
        assert_eq!(config.ohlcv, FetchSettings::ohlcv());
        assert_eq!(config.cache.max_entries, 16);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_empty_config_uses_site_defaults() {
        let config = Config::parse("").expect("should parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.token_meta.chunk_size, 100);
        assert_eq!(config.token_meta.max_concurrent, 3);
        assert_eq!(config.ohlcv.base_delay_ms, 1000);
        assert_eq!(config.options.max_concurrent, 2);
        assert_eq!(config.cache.max_entries, 1024);
    }

    #[test]
    fn test_partial_section_falls_back_per_field() {
        let config = Config::parse("[options]\nmax_concurrent = 1\n").expect("should parse");
        assert_eq!(config.options.max_concurrent, 1);
        assert_eq!(config.options.max_retries, 3);
        assert_eq!(config.options.backoff_cap_ms, 5000);
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let err = Config::parse("[token_meta]\nmax_concurrent = 0\n").unwrap_err();
        assert!(err.to_string().contains("token_meta.max_concurrent"));
    }

    #[test]
    fn test_validation_rejects_base_above_cap() {
        let err = Config::parse("[ohlcv]\nbase_delay_ms = 9000\nbackoff_cap_ms = 1000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validation_rejects_bad_url() {
        let err = Config::parse("[upstream]\nkraken_base_url = \"api.kraken.com\"\n").unwrap_err();
        assert!(err.to_string().contains("upstream.kraken_base_url"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HOST", "127.0.0.1"),
            ("PORT", "9090"),
            ("ALPACA_API_KEY_ID", "id"),
            ("ALPACA_API_SECRET_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.upstream.alpaca_key_id, "id");
        assert_eq!(config.upstream.alpaca_secret_key, "secret");
        assert_eq!(config.upstream.helius_rpc_url, "https://mainnet.helius-rpc.com/");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("does/not/exist.toml").expect("defaults");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_override_replaces_invalid_file_value() {
        let path = std::env::temp_dir().join(format!("gateway-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[upstream]\nhelius_rpc_url = \"not-a-url\"\n").expect("write config");

        let loaded = Config::load_or_default_with(&path, |key| {
            (key == "HELIUS_RPC_URL").then(|| "https://rpc.example.com/".to_string())
        });
        let without_override = Config::load_or_default_with(&path, |_| None);
        let strict = Config::load(&path);
        let _ = fs::remove_file(&path);

        let config = loaded.expect("override should fix the url");
        assert_eq!(config.upstream.helius_rpc_url, "https://rpc.example.com/");
        assert!(without_override.unwrap_err().to_string().contains("upstream.helius_rpc_url"));
        assert!(strict.is_err());
    }

    #[test]
    fn test_default_timeout_is_fifteen_seconds() {
        assert_eq!(FetchSettings::default().timeout_ms, 15_000);
        assert_eq!(FetchSettings::ohlcv().timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let bundled = Config::parse(include_str!("../config/default.toml")).expect("bundled config");
        let defaults = Config::default();
        assert_eq!(bundled.token_meta, defaults.token_meta);
        assert_eq!(bundled.ohlcv, defaults.ohlcv);
        assert_eq!(bundled.options, defaults.options);
        assert_eq!(bundled.cache.max_entries, defaults.cache.max_entries);
        assert_eq!(bundled.upstream.alpaca_base_url, defaults.upstream.alpaca_base_url);
    }
}
