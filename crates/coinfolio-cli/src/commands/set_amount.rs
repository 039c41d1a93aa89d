//! Set-amount command - Set or clear the owned amount of a holding

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use tracing::info;

use coinfolio_core::domain::CoinId;
use coinfolio_sync::SyncError;

use super::Invocation;

#[derive(Debug, Args)]
pub struct SetAmountCommand {
    /// Provider id of the held coin
    pub id: CoinId,

    /// Amount owned, or `none` to clear it
    #[arg(value_name = "AMOUNT|none")]
    pub amount: String,
}

impl SetAmountCommand {
    pub async fn execute(&self, invocation: &Invocation) -> Result<()> {
        let formatter = invocation.formatter();
        let amount = parse_amount(&self.amount)?;
        let portfolio = invocation.open_portfolio().await?;

        info!(id = %self.id, amount = ?amount, "Setting owned amount");
        match portfolio.set_owned_amount(self.id, amount).await {
            Ok(holding) => {
                if invocation.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "holding": holding,
                    }));
                } else {
                    let coin = holding.coin();
                    match (holding.owned_amount(), holding.value_in_fiat()) {
                        (Some(amount), Some(value)) => formatter.success(&format!(
                            "{} {} = {} {}",
                            amount.normalize(),
                            coin.symbol,
                            value.round_dp(2),
                            coin.fiat_code
                        )),
                        _ => formatter.success(&format!("Cleared amount of {}", coin.symbol)),
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

/// Parses an owned amount; `none` (any case) or an empty string clears it
fn parse_amount(value: &str) -> Result<Option<Decimal>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let amount = Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .with_context(|| format!("Invalid amount '{}'", value))?;
    Ok(Some(amount))
}
