//! Config command - View and manage Coinfolio configuration
//!
//! Provides the `coinfolio config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports every error

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use coinfolio_core::config::Config;
use coinfolio_core::domain::FiatCode;

use super::Invocation;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("market.base_url", "Market data API base URL"),
    ("market.api_key", "API key (none to clear)"),
    ("market.timeout_secs", "Per-request timeout in seconds"),
    ("market.max_retries", "Retries on connection failure or HTTP 429"),
    ("market.listing_limit", "Number of coins in the catalog"),
    ("sync.fetch_delay_ms", "Delay before each network call"),
    ("sync.catalog_refresh_minutes", "Catalog freshness window (0 disables)"),
    ("sync.channel_capacity", "Buffered values per observation"),
    ("session.fiat_code", "Display currency, e.g. USD or EUR"),
    ("storage.database_path", "SQLite database file"),
    ("logging.level", "trace|debug|info|warn|error"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "session.fiat_code")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(invocation),
            ConfigCommand::Set { key, value } => self.execute_set(invocation, key, value),
            ConfigCommand::Validate => self.execute_validate(invocation),
        }
    }

    fn execute_show(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let config_path = invocation.config_path();
        let config = invocation.config();

        info!(config_path = %config_path.display(), "Showing configuration");

        if invocation.is_json() {
            let json = serde_json::to_value(config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(&self, invocation: &Invocation, key: &str, value: &str) -> Result<()> {
        let formatter = invocation.formatter();
        let config_path = invocation.config_path();
        let mut config = invocation.config().clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if invocation.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<30} - {}", name, description));
                }
            }
            return Ok(());
        }

        let errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        if !errors.is_empty() {
            if invocation.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    errors.join("; ")
                ));
            }
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(config_path, yaml).context("Failed to write configuration file")?;

        if invocation.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let config_path = invocation.config_path();

        // Load explicitly: a parse error must be reported, not defaulted
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if invocation.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info(
                        "Using default configuration. Run 'coinfolio config set <key> <value>' to create one.",
                    );
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if invocation.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("Expected a non-negative integer for {}", key))
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// See [`SUPPORTED_KEYS`] for the accepted keys.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- market ---
        "market.base_url" => config.market.base_url = value.trim_end_matches('/').to_string(),
        "market.api_key" => {
            config.market.api_key = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "market.timeout_secs" => config.market.timeout_secs = parse_number(key, value)?,
        "market.max_retries" => config.market.max_retries = parse_number(key, value)?,
        "market.listing_limit" => config.market.listing_limit = parse_number(key, value)?,

        // --- sync ---
        "sync.fetch_delay_ms" => config.sync.fetch_delay_ms = parse_number(key, value)?,
        "sync.catalog_refresh_minutes" => {
            config.sync.catalog_refresh_minutes = parse_number(key, value)?;
        }
        "sync.channel_capacity" => config.sync.channel_capacity = parse_number(key, value)?,

        // --- session ---
        "session.fiat_code" => {
            config.session.fiat_code =
                FiatCode::new(value).context("Expected a 3 to 5 letter currency code")?;
        }

        // --- storage ---
        "storage.database_path" => config.storage.database_path = PathBuf::from(value),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }

    Ok(())
}
