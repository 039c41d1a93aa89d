//! Row mapping between SQLite and domain types
//!
//! | Domain Type     | SQL Type | Strategy                                   |
//! |-----------------|----------|--------------------------------------------|
//! | CoinId          | INTEGER  | `as_i64()` / `CoinId::try_from(i64)`       |
//! | FiatCode        | TEXT     | `as_str()` / `FiatCode::new()`             |
//! | Decimal         | TEXT     | `to_string()` / `Decimal::from_str()` (exact) |
//! | DateTime<Utc>   | TEXT     | RFC 3339 with full sub-second precision    |
//!
//! Decimals are stored as text so that no precision is lost; fetch epochs keep
//! their nanoseconds so that coherence checks compare exactly what was written.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use coinfolio_core::domain::{Coin, CoinId, FiatCode, Holding};

use crate::CacheError;

/// Coin columns shared by both tables, in insert order
pub(crate) const COIN_COLUMNS: &str = "id, name, symbol, rank, fiat_code, price, \
     percent_change_1h, percent_change_24h, percent_change_7d, fetched_at";

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_decimal(column: &str, s: &str) -> Result<Decimal, CacheError> {
    Decimal::from_str(s).map_err(|e| {
        CacheError::SerializationError(format!("Invalid decimal in {} '{}': {}", column, s, e))
    })
}

fn parse_optional_decimal(column: &str, s: Option<String>) -> Result<Option<Decimal>, CacheError> {
    s.as_deref().map(|v| parse_decimal(column, v)).transpose()
}

/// Reconstruct a Coin from the coin columns of either table
pub(crate) fn coin_from_row(row: &SqliteRow) -> Result<Coin, CacheError> {
    let id: i64 = row.try_get("id")?;
    let rank: i64 = row.try_get("rank")?;
    let fiat_code: String = row.try_get("fiat_code")?;
    let price: String = row.try_get("price")?;
    let change_1h: String = row.try_get("percent_change_1h")?;
    let change_24h: String = row.try_get("percent_change_24h")?;
    let change_7d: String = row.try_get("percent_change_7d")?;
    let fetched_at: String = row.try_get("fetched_at")?;

    Ok(Coin {
        id: CoinId::try_from(id)
            .map_err(|e| CacheError::SerializationError(format!("Invalid CoinId: {}", e)))?,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        rank: u32::try_from(rank)
            .map_err(|_| CacheError::SerializationError(format!("Invalid rank: {}", rank)))?,
        fiat_code: FiatCode::new(&fiat_code).map_err(|e| {
            CacheError::SerializationError(format!("Invalid FiatCode '{}': {}", fiat_code, e))
        })?,
        price: parse_decimal("price", &price)?,
        percent_change_1h: parse_decimal("percent_change_1h", &change_1h)?,
        percent_change_24h: parse_decimal("percent_change_24h", &change_24h)?,
        percent_change_7d: parse_decimal("percent_change_7d", &change_7d)?,
        fetched_at: parse_datetime(&fetched_at)?,
    })
}

/// Reconstruct a Holding from a holdings row
///
/// Derived value columns are recomputed from the amount and the coin rather
/// than trusted.
pub(crate) fn holding_from_row(row: &SqliteRow) -> Result<Holding, CacheError> {
    let coin = coin_from_row(row)?;
    let owned_amount = parse_optional_decimal("owned_amount", row.try_get("owned_amount")?)?;
    Ok(Holding::with_amount(coin, owned_amount)?)
}

/// Bound values of the coin columns, in [`COIN_COLUMNS`] order
pub(crate) struct CoinBinds {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub rank: i64,
    pub fiat_code: String,
    pub price: String,
    pub change_1h: String,
    pub change_24h: String,
    pub change_7d: String,
    pub fetched_at: String,
}

impl From<&Coin> for CoinBinds {
    fn from(coin: &Coin) -> Self {
        Self {
            id: coin.id.as_i64(),
            name: coin.name.clone(),
            symbol: coin.symbol.clone(),
            rank: i64::from(coin.rank),
            fiat_code: coin.fiat_code.as_str().to_string(),
            price: coin.price.to_string(),
            change_1h: coin.percent_change_1h.to_string(),
            change_24h: coin.percent_change_24h.to_string(),
            change_7d: coin.percent_change_7d.to_string(),
            fetched_at: format_datetime(&coin.fetched_at),
        }
    }
}

pub(crate) fn optional_decimal(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

/// Sorts holdings by value (largest first, unvalued last), then rank
pub(crate) fn sort_holdings(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| {
        b.value_in_fiat()
            .cmp(&a.value_in_fiat())
            .then_with(|| a.coin().rank.cmp(&b.coin().rank))
    });
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_datetime_roundtrip_keeps_nanos() {
        let dt = Utc.timestamp_opt(1_772_366_400, 123_456_789).unwrap();
        let parsed = parse_datetime(&format_datetime(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(parse_decimal("price", "1.25").is_ok());
        assert!(parse_decimal("price", "abc").is_err());
    }

    #[test]
    fn test_optional_decimal() {
        assert_eq!(parse_optional_decimal("x", None).unwrap(), None);
        assert_eq!(
            parse_optional_decimal("x", Some("2.5".into())).unwrap(),
            Some(Decimal::new(25, 1))
        );
        assert_eq!(optional_decimal(Some(Decimal::new(25, 1))), Some("2.5".into()));
    }
}
