//! Catalog command - Show the coin catalog
//!
//! Serves the catalog from the local store and refreshes it from the market
//! source when it is empty, priced in another currency, or older than the
//! configured refresh window.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use coinfolio_core::domain::{Coin, FiatCode};
use coinfolio_sync::{CatalogResource, Session};

use super::{origin, settle, warn_on_error, Invocation};
use crate::output::{format_amount, format_percent};

#[derive(Debug, Args)]
pub struct CatalogCommand {
    /// Quote currency (defaults to the configured session currency)
    #[arg(long)]
    pub fiat: Option<String>,

    /// Only show the first N coins by rank
    #[arg(long)]
    pub top: Option<usize>,
}

impl CatalogCommand {
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let config = invocation.config();

        let session = match &self.fiat {
            Some(code) => Session::new(FiatCode::new(code).context("Invalid --fiat")?),
            None => Session::from_config(config),
        };
        info!(fiat = %session.fiat_code, "Showing catalog");

        let resource = Arc::new(CatalogResource::from_config(
            invocation.open_store().await?,
            invocation.open_source()?,
            session,
            config,
        ));
        let Some(snapshot) = settle(invocation.engine().observe(resource)).await else {
            formatter.error("Catalog observation ended without a result");
            return Ok(());
        };

        let snapshot = snapshot.map(|coins| match self.top {
            Some(n) => coins.into_iter().take(n).collect(),
            None => coins,
        });

        if invocation.is_json() {
            formatter.print_json(&serde_json::to_value(&snapshot)?);
            return Ok(());
        }

        warn_on_error(formatter.as_ref(), &snapshot);
        let coins = snapshot.data.unwrap_or_default();
        if coins.is_empty() {
            formatter.info("The catalog is empty");
            return Ok(());
        }

        formatter.success(&format!(
            "{} coins in {} ({})",
            coins.len(),
            coins[0].fiat_code,
            origin(&snapshot.status)
        ));
        formatter.table(
            &["Coin", "Rank", "Price", "1h", "24h", "7d"],
            &coins.iter().map(catalog_row).collect::<Vec<_>>(),
        );
        Ok(())
    }
}

fn catalog_row(coin: &Coin) -> Vec<String> {
    vec![
        format!("{} {} ({})", coin.id, coin.name, coin.symbol),
        coin.rank.to_string(),
        format_amount(coin.price),
        format_percent(coin.percent_change_1h),
        format_percent(coin.percent_change_24h),
        format_percent(coin.percent_change_7d),
    ]
}
