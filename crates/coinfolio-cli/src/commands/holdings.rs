//! Holdings command - Show holdings and portfolio totals
//!
//! Holdings are served from the local store when they form one coherent
//! batch in the requested currency; otherwise they are re-quoted first.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use coinfolio_core::domain::{FiatCode, Holding, PortfolioSummary};
use coinfolio_sync::HoldingsResource;

use super::{origin, settle, warn_on_error, Invocation};
use crate::output::{format_amount, format_percent};

#[derive(Debug, Args)]
pub struct HoldingsCommand {
    /// Quote currency (defaults to the configured session currency)
    #[arg(long)]
    pub fiat: Option<String>,
}

impl HoldingsCommand {
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let config = invocation.config();

        let target = match &self.fiat {
            Some(code) => FiatCode::new(code).context("Invalid --fiat")?,
            None => config.session.fiat_code.clone(),
        };
        info!(fiat = %target, "Showing holdings");

        let resource = Arc::new(
            HoldingsResource::new(
                invocation.open_store().await?,
                invocation.open_source()?,
                target.clone(),
            )
            .with_fetch_delay(config.sync.fetch_delay()),
        );
        let Some(snapshot) = settle(invocation.engine().observe(resource)).await else {
            formatter.error("Holdings observation ended without a result");
            return Ok(());
        };

        let summary = match snapshot
            .data
            .as_deref()
            .map(PortfolioSummary::from_holdings)
            .transpose()
        {
            Ok(summary) => summary,
            Err(e) => {
                formatter.warn(&format!("Cannot total holdings: {}", e));
                None
            }
        };

        if invocation.is_json() {
            let json = serde_json::json!({
                "holdings": snapshot,
                "summary": summary,
            });
            formatter.print_json(&json);
            return Ok(());
        }

        warn_on_error(formatter.as_ref(), &snapshot);
        let holdings = snapshot.data.as_deref().unwrap_or_default();
        if holdings.is_empty() {
            formatter.info("No holdings yet. Add one with 'coinfolio add <id>'");
            return Ok(());
        }

        formatter.success(&format!(
            "{} holdings ({})",
            holdings.len(),
            origin(&snapshot.status)
        ));
        formatter.table(
            &["Coin", "Price", "24h", "Amount", "Value", "24h value"],
            &holdings.iter().map(holding_row).collect::<Vec<_>>(),
        );

        if let Some(summary) = summary {
            formatter.info("");
            let currency = summary
                .fiat_code
                .as_ref()
                .map_or_else(|| target.to_string(), ToString::to_string);
            let change = summary
                .percent_change_24h
                .map(|pct| format!(" ({})", format_percent(pct)))
                .unwrap_or_default();
            formatter.info(&format!(
                "Total: {} {}, 24h: {} {}{}",
                format_amount(summary.total_value),
                currency,
                format_amount(summary.total_change_24h),
                currency,
                change
            ));
            if !summary.coherent {
                formatter.warn("Holdings were priced at different times; totals are approximate");
            }
        }
        Ok(())
    }
}

fn holding_row(holding: &Holding) -> Vec<String> {
    let coin = holding.coin();
    let dash = || "-".to_string();
    vec![
        format!("{} {} ({})", coin.id, coin.name, coin.symbol),
        format!("{} {}", format_amount(coin.price), coin.fiat_code),
        format_percent(coin.percent_change_24h),
        holding
            .owned_amount()
            .map_or_else(dash, |amount| amount.normalize().to_string()),
        holding.value_in_fiat().map_or_else(dash, format_amount),
        holding
            .value_change_24h_in_fiat()
            .map_or_else(dash, format_amount),
    ]
}
