//! Configuration module for Coinfolio.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::FiatCode;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Coinfolio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub market: MarketConfig,
    pub sync: SyncConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Remote market data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Base URL of the CoinMarketCap-compatible API.
    pub base_url: String,
    /// API key sent in the `X-CMC_PRO_API_KEY` header.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries on connection failure or HTTP 429.
    pub max_retries: u32,
    /// Number of coins requested for the catalog.
    pub listing_limit: u32,
}

/// Synchronization engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay before the network call, in milliseconds (perceived responsiveness only).
    pub fetch_delay_ms: u64,
    /// Minutes a catalog fetch stays fresh for the same currency (0 disables throttling).
    pub catalog_refresh_minutes: u64,
    /// Buffered resource values per observation.
    pub channel_capacity: usize,
}

/// Session state applied at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display currency.
    pub fiat_code: FiatCode,
}

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database file.
    pub database_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/coinfolio/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("coinfolio")
            .join("config.yaml")
    }
}

impl MarketConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncConfig {
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    /// Freshness window of a catalog fetch, `None` when throttling is disabled.
    pub fn catalog_refresh_window(&self) -> Option<Duration> {
        (self.catalog_refresh_minutes > 0)
            .then(|| Duration::from_secs(self.catalog_refresh_minutes * 60))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pro-api.coinmarketcap.com".to_string(),
            api_key: None,
            timeout_secs: 15,
            max_retries: 3,
            listing_limit: 100,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_delay_ms: 300,
            catalog_refresh_minutes: 5,
            channel_capacity: 16,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("coinfolio")
                .join("coinfolio.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"market.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound accepted by the listings endpoint.
const MAX_LISTING_LIMIT: u32 = 5000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- market ---
        if !(self.market.base_url.starts_with("http://")
            || self.market.base_url.starts_with("https://"))
        {
            push(
                "market.base_url",
                format!("must be an http(s) URL: {}", self.market.base_url),
            );
        }
        if matches!(self.market.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            push("market.api_key", "must not be blank when set".into());
        }
        if self.market.timeout_secs == 0 {
            push("market.timeout_secs", "must be greater than 0".into());
        }
        if self.market.listing_limit == 0 || self.market.listing_limit > MAX_LISTING_LIMIT {
            push(
                "market.listing_limit",
                format!("must be between 1 and {MAX_LISTING_LIMIT}"),
            );
        }

        // --- sync ---
        if self.sync.channel_capacity == 0 {
            push("sync.channel_capacity", "must be greater than 0".into());
        }

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            push("storage.database_path", "must not be empty".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and overrides individual fields.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.market.base_url = url.into();
        self
    }

    pub fn market_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.market.api_key = Some(key.into());
        self
    }

    pub fn market_timeout_secs(mut self, secs: u64) -> Self {
        self.config.market.timeout_secs = secs;
        self
    }

    pub fn market_max_retries(mut self, n: u32) -> Self {
        self.config.market.max_retries = n;
        self
    }

    pub fn market_listing_limit(mut self, n: u32) -> Self {
        self.config.market.listing_limit = n;
        self
    }

    pub fn sync_fetch_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.fetch_delay_ms = ms;
        self
    }

    pub fn sync_catalog_refresh_minutes(mut self, minutes: u64) -> Self {
        self.config.sync.catalog_refresh_minutes = minutes;
        self
    }

    pub fn sync_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.sync.channel_capacity = capacity;
        self
    }

    pub fn session_fiat_code(mut self, code: FiatCode) -> Self {
        self.config.session.fiat_code = code;
        self
    }

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Build without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate, returning every error found.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}
