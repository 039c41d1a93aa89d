//! Remote-origin market data for one tradable asset
//!
//! A [`Coin`] is the catalog row the market provider owns. Every field is
//! overwritten on each successful fetch; nothing here is user-authored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::newtypes::{CoinId, FiatCode};

/// Market snapshot of one asset, priced in a single quote currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Provider identifier, shared with the holdings table
    pub id: CoinId,
    /// Display name (e.g. "Bitcoin")
    pub name: String,
    /// Ticker symbol (e.g. "BTC")
    pub symbol: String,
    /// Market-cap rank, 1 is the largest
    pub rank: u32,
    /// Currency `price` and the derived holding values are expressed in
    pub fiat_code: FiatCode,
    /// Latest price in `fiat_code`
    pub price: Decimal,
    /// Price change over the last hour, in percent
    pub percent_change_1h: Decimal,
    /// Price change over the last 24 hours, in percent
    pub percent_change_24h: Decimal,
    /// Price change over the last 7 days, in percent
    pub percent_change_7d: Decimal,
    /// Fetch epoch shared by every coin of the same response
    pub fetched_at: DateTime<Utc>,
}

impl Coin {
    /// Returns true if `other` carries a different market snapshot of the
    /// same asset (same id, any remote field changed)
    pub fn differs_from(&self, other: &Coin) -> bool {
        self.id == other.id && self != other
    }
}
