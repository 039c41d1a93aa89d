//! CLI subcommands
//!
//! Every command receives the [`Invocation`]: the loaded configuration,
//! where it came from, and the selected output format. Commands that read
//! market data open the local store and the market source from it.

pub mod add;
pub mod catalog;
pub mod config;
pub mod holdings;
pub mod remove;
pub mod set_amount;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use coinfolio_cache::{DatabasePool, SqliteMarketStore};
use coinfolio_core::config::Config;
use coinfolio_core::domain::{Resource, Status};
use coinfolio_market::CoinMarketCapSource;
use coinfolio_sync::{Observation, Portfolio, SyncEngine};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options shared by all commands
#[derive(Debug)]
pub struct Invocation {
    config_path: PathBuf,
    config: Config,
    format: OutputFormat,
}

impl Invocation {
    /// Resolves the configuration file (falling back to defaults)
    pub fn new(config_path: Option<PathBuf>, json: bool) -> Self {
        let config_path = config_path.unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&config_path);
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        };
        Self {
            config_path,
            config,
            format,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }

    /// Opens (and migrates) the local database
    pub async fn open_store(&self) -> Result<Arc<SqliteMarketStore>> {
        let path = &self.config.storage.database_path;
        let pool = DatabasePool::new(path)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        debug!(path = %path.display(), "Local store opened");
        Ok(Arc::new(SqliteMarketStore::new(pool.pool().clone())))
    }

    pub fn open_source(&self) -> Result<Arc<CoinMarketCapSource>> {
        let source = CoinMarketCapSource::from_config(&self.config.market)
            .context("Failed to build the market data client")?;
        Ok(Arc::new(source))
    }

    pub async fn open_portfolio(&self) -> Result<Portfolio> {
        Ok(Portfolio::new(self.open_store().await?))
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(&self.config.sync)
    }
}

/// Waits for the first snapshot that is no longer loading
///
/// Dropping the observation afterwards cancels whatever the cycle still has
/// in flight; a one-shot command has no use for later store changes.
pub async fn settle<T>(mut observation: Observation<T>) -> Option<Resource<T>> {
    while let Some(resource) = observation.next().await {
        if resource.is_loading() {
            debug!(has_data = resource.data.is_some(), "Still loading");
            continue;
        }
        return Some(resource);
    }
    None
}

/// Reports an error snapshot as a warning; the data still shown is the cache
pub fn warn_on_error<T>(formatter: &dyn OutputFormatter, resource: &Resource<T>) {
    if let Some(message) = resource.message() {
        let note = if resource.data.is_some() {
            "showing cached data"
        } else {
            "nothing cached yet"
        };
        formatter.warn(&format!("Refresh failed: {} ({})", message, note));
    }
}

/// Short label for where a settled snapshot came from
pub fn origin(status: &Status) -> &'static str {
    match status {
        Status::Loading => "loading",
        Status::SuccessFromCache => "cached",
        Status::SuccessFromNetwork => "refreshed",
        Status::Error(_) => "stale",
    }
}
