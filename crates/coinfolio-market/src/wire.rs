//! Response DTOs for the market data API
//!
//! Every response is wrapped in an envelope:
//!
//! ```json
//! {
//!   "status": { "timestamp": "...", "error_code": 0, "error_message": null },
//!   "data": ...
//! }
//! ```
//!
//! Listings carry `data` as an array, quotes as an object keyed by id. Each
//! coin carries one quote object per requested conversion currency.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use coinfolio_core::domain::{Coin, CoinId, FiatCode};

use crate::MarketError;

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub data: Option<T>,
}

/// Status block of the envelope, present on success and on error
#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeStatus {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Error body, which sometimes lacks `data`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub status: EnvelopeStatus,
}

/// One coin as listed by the API
#[derive(Debug, Deserialize)]
pub struct WireCoin {
    pub id: u32,
    pub name: String,
    pub symbol: String,
    /// Null for untracked coins
    pub cmc_rank: Option<u32>,
    #[serde(default)]
    pub quote: HashMap<String, WireQuote>,
}

/// Price block for one conversion currency
#[derive(Debug, Deserialize)]
pub struct WireQuote {
    pub price: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
}

/// The quotes endpoint answers with a map keyed by id; some deployments
/// return a plain list instead
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuotesData {
    ById(BTreeMap<String, WireCoin>),
    List(Vec<WireCoin>),
}

impl QuotesData {
    pub fn into_coins(self) -> Vec<WireCoin> {
        match self {
            QuotesData::ById(map) => map.into_values().collect(),
            QuotesData::List(list) => list,
        }
    }
}

fn decimal(field: &str, value: Option<f64>) -> Result<Decimal, MarketError> {
    match value {
        None => Ok(Decimal::ZERO),
        Some(v) => Decimal::try_from(v)
            .map_err(|e| MarketError::InvalidResponse(format!("{field} = {v}: {e}"))),
    }
}

impl WireCoin {
    /// Converts into a domain coin quoted in `fiat`
    ///
    /// Returns `Ok(None)` when the API omitted the requested currency.
    pub fn into_coin(
        self,
        fiat: &FiatCode,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<Coin>, MarketError> {
        let quote = self.quote.get(fiat.as_str()).or_else(|| {
            self.quote
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(fiat.as_str()))
                .map(|(_, q)| q)
        });
        let Some(quote) = quote else {
            warn!(id = self.id, fiat = %fiat, "Quote missing for requested currency");
            return Ok(None);
        };

        Ok(Some(Coin {
            id: CoinId::new(self.id),
            name: self.name,
            symbol: self.symbol,
            rank: self.cmc_rank.unwrap_or(u32::MAX),
            fiat_code: fiat.clone(),
            price: decimal("price", quote.price)?,
            percent_change_1h: decimal("percent_change_1h", quote.percent_change_1h)?,
            percent_change_24h: decimal("percent_change_24h", quote.percent_change_24h)?,
            percent_change_7d: decimal("percent_change_7d", quote.percent_change_7d)?,
            fetched_at,
        }))
    }
}

/// Converts a batch, stamping every coin with the same fetch epoch
pub fn into_coins(
    wire: Vec<WireCoin>,
    fiat: &FiatCode,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Coin>, MarketError> {
    let mut coins = Vec::with_capacity(wire.len());
    for coin in wire {
        if let Some(coin) = coin.into_coin(fiat, fetched_at)? {
            coins.push(coin);
        }
    }
    coins.sort_by_key(|c| (c.rank, c.id));
    Ok(coins)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "status": {"timestamp": "2026-03-01T12:00:00.000Z", "error_code": 0, "error_message": null},
        "data": [
            {"id": 1027, "name": "Ethereum", "symbol": "ETH", "cmc_rank": 2,
             "quote": {"EUR": {"price": 2000.5, "percent_change_1h": 0.1, "percent_change_24h": -2.5, "percent_change_7d": 4}}},
            {"id": 1, "name": "Bitcoin", "symbol": "BTC", "cmc_rank": 1,
             "quote": {"EUR": {"price": 60000, "percent_change_1h": null, "percent_change_24h": 1.25, "percent_change_7d": 3}}}
        ]
    }"#;

    #[test]
    fn test_listing_deserialization() {
        let envelope: Envelope<Vec<WireCoin>> = serde_json::from_str(LISTING).unwrap();
        assert_eq!(envelope.status.error_code, Some(0));
        let data = envelope.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].symbol, "ETH");
    }

    #[test]
    fn test_into_coins_sorts_and_stamps() {
        let envelope: Envelope<Vec<WireCoin>> = serde_json::from_str(LISTING).unwrap();
        let fetched_at = envelope.status.timestamp.unwrap();
        let eur = FiatCode::new("EUR").unwrap();
        let coins = into_coins(envelope.data.unwrap(), &eur, fetched_at).unwrap();

        assert_eq!(coins[0].id, CoinId::new(1));
        assert_eq!(coins[0].percent_change_1h, Decimal::ZERO);
        assert_eq!(coins[1].percent_change_24h, Decimal::new(-25, 1));
        assert!(coins.iter().all(|c| c.fetched_at == fetched_at && c.fiat_code == eur));
    }

    #[test]
    fn test_missing_currency_is_skipped() {
        let envelope: Envelope<Vec<WireCoin>> = serde_json::from_str(LISTING).unwrap();
        let coins = into_coins(envelope.data.unwrap(), &FiatCode::usd(), Utc::now()).unwrap();
        assert!(coins.is_empty());
    }

    #[test]
    fn test_quotes_by_id_map() {
        let json = r#"{"1": {"id": 1, "name": "Bitcoin", "symbol": "BTC", "cmc_rank": 1, "quote": {}}}"#;
        let data: QuotesData = serde_json::from_str(json).unwrap();
        assert_eq!(data.into_coins().len(), 1);
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"status": {"timestamp": "2026-03-01T12:00:00Z", "error_code": 1002, "error_message": "API key missing."}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status.error_code, Some(1002));
        assert_eq!(envelope.status.error_message.as_deref(), Some("API key missing."));
    }
}
