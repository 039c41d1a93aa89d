//! Add command - Start tracking a catalog coin
//!
//! The coin must already be in the local catalog (run `coinfolio catalog`
//! first). Adding a coin that is already held refreshes its snapshot and
//! keeps the owned amount.

use anyhow::Result;
use clap::Args;
use tracing::info;

use coinfolio_core::domain::CoinId;
use coinfolio_sync::SyncError;

use super::Invocation;

#[derive(Debug, Args)]
pub struct AddCommand {
    /// Provider id of the coin (as shown by `coinfolio catalog`)
    pub id: CoinId,
}

impl AddCommand {
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let portfolio = invocation.open_portfolio().await?;

        info!(id = %self.id, "Adding holding");
        match portfolio.add_holding(self.id).await {
            Ok(holding) => {
                if invocation.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "holding": holding,
                    }));
                } else {
                    let coin = holding.coin();
                    formatter.success(&format!("Tracking {} ({})", coin.name, coin.symbol));
                    if holding.owned_amount().is_none() {
                        formatter.info(&format!(
                            "Set the amount you own with 'coinfolio set-amount {} <amount>'",
                            self.id
                        ));
                    }
                }
                Ok(())
            }
            Err(SyncError::Store(e)) => Err(e),
            Err(e) => {
                formatter.error(&e.to_string());
                Ok(())
            }
        }
    }
}
