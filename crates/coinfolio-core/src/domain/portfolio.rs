//! Portfolio totals over a batch of holdings

use rust_decimal::Decimal;
use serde::Serialize;

use super::coherence::{is_coherent, Quoted};
use super::errors::DomainError;
use super::holding::Holding;
use super::newtypes::FiatCode;

/// Aggregated value of the user's holdings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    /// Quote currency of the totals; `None` for an empty or mixed batch
    pub fiat_code: Option<FiatCode>,
    /// Sum of `value_in_fiat` over holdings with an amount
    pub total_value: Decimal,
    /// Sum of `value_change_24h_in_fiat`
    pub total_change_24h: Decimal,
    /// Change relative to the value 24 hours ago, in percent
    pub percent_change_24h: Option<Decimal>,
    /// Whether every holding shares one fetch epoch
    pub coherent: bool,
}

impl PortfolioSummary {
    /// # Errors
    /// Returns `DomainError::Overflow` if a total does not fit a `Decimal`.
    pub fn from_holdings(holdings: &[Holding]) -> Result<Self, DomainError> {
        let total_value = checked_sum(holdings.iter().filter_map(Holding::value_in_fiat))?;
        let total_change_24h =
            checked_sum(holdings.iter().filter_map(Holding::value_change_24h_in_fiat))?;

        let fiat_code = holdings.first().map(|h| h.fiat_code().clone()).filter(|code| {
            holdings.iter().all(|h| h.fiat_code() == code)
        });

        // None when the base is zero or the ratio is out of range
        let percent_change_24h = total_value
            .checked_sub(total_change_24h)
            .filter(|previous| !previous.is_zero())
            .and_then(|previous| total_change_24h.checked_div(previous))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| pct.round_dp(2));

        Ok(Self {
            fiat_code,
            total_value,
            total_change_24h,
            percent_change_24h,
            coherent: is_coherent(holdings),
        })
    }
}

fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal, DomainError> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| DomainError::Overflow(format!("portfolio total {acc} + {v}")))
    })
}
