//! Remove command - Stop tracking one or more coins
//!
//! Removal is atomic over all given ids. The removed rows, including their
//! owned amounts, are printed so they can be re-added.

use anyhow::Result;
use clap::Args;
use tracing::info;

use coinfolio_core::domain::CoinId;

use super::Invocation;

#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Provider ids of the coins to remove
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<CoinId>,
}

impl RemoveCommand {
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let portfolio = invocation.open_portfolio().await?;

        info!(count = self.ids.len(), "Removing holdings");
        let removed = portfolio.remove(&self.ids).await?;

        if invocation.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "removed": removed,
            }));
            return Ok(());
        }

        if removed.is_empty() {
            formatter.warn("None of the given coins are held");
            return Ok(());
        }
        formatter.success(&format!("Removed {} holding(s)", removed.len()));
        for holding in &removed {
            let coin = holding.coin();
            let amount = holding
                .owned_amount()
                .map(|a| format!(", owned {}", a.normalize()))
                .unwrap_or_default();
            formatter.info(&format!("{} {} ({}){}", coin.id, coin.name, coin.symbol, amount));
        }
        let missing = self.ids.len() - removed.len();
        if missing > 0 {
            formatter.info(&format!("{} id(s) were not held", missing));
        }
        Ok(())
    }
}
