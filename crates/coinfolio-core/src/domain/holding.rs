//! User-owned holdings
//!
//! A [`Holding`] pairs the latest known [`Coin`] snapshot with the amount the
//! user owns. `owned_amount` is the only user-authored field: remote refreshes
//! replace the embedded coin and recompute the derived values, but never touch
//! the amount.
//!
//! ## Invariants
//!
//! - `coin.id == id`
//! - `value_in_fiat == owned_amount * coin.price` when an amount is set,
//!   `None` otherwise
//! - `value_change_24h_in_fiat == value_in_fiat * coin.percent_change_24h / 100`
//!   under the same nullability
//!
//! Fields are private so every mutation goes through a method that restores
//! these invariants. Derived values that would not fit a `Decimal` reject the
//! mutation with `DomainError::Overflow` and leave the holding unchanged.

use rust_decimal::Decimal;
use serde::Serialize;

use super::coin::Coin;
use super::errors::DomainError;
use super::newtypes::CoinId;

/// A coin the user tracks, with an optional owned amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    id: CoinId,
    coin: Coin,
    owned_amount: Option<Decimal>,
    value_in_fiat: Option<Decimal>,
    value_change_24h_in_fiat: Option<Decimal>,
}

impl Holding {
    /// Creates a holding with no owned amount yet
    pub fn new(coin: Coin) -> Self {
        Self {
            id: coin.id,
            coin,
            owned_amount: None,
            value_in_fiat: None,
            value_change_24h_in_fiat: None,
        }
    }

    /// Creates a holding from a coin snapshot and a stored amount
    ///
    /// Derived values are always recomputed, so rows read back from storage
    /// cannot carry stale totals. The sign of the amount is trusted as-is;
    /// validation happens in [`Holding::set_owned_amount`].
    ///
    /// # Errors
    /// Returns `DomainError::Overflow` if the derived values do not fit.
    pub fn with_amount(coin: Coin, owned_amount: Option<Decimal>) -> Result<Self, DomainError> {
        let (value_in_fiat, value_change_24h_in_fiat) = derive_values(&coin, owned_amount)?;
        Ok(Self {
            id: coin.id,
            coin,
            owned_amount,
            value_in_fiat,
            value_change_24h_in_fiat,
        })
    }

    pub fn id(&self) -> CoinId {
        self.id
    }

    /// Latest known market snapshot
    pub fn coin(&self) -> &Coin {
        &self.coin
    }

    pub fn owned_amount(&self) -> Option<Decimal> {
        self.owned_amount
    }

    pub fn value_in_fiat(&self) -> Option<Decimal> {
        self.value_in_fiat
    }

    pub fn value_change_24h_in_fiat(&self) -> Option<Decimal> {
        self.value_change_24h_in_fiat
    }

    /// Replaces the embedded coin snapshot, keeping the owned amount
    ///
    /// # Errors
    /// Returns `DomainError::IdMismatch` if the coin belongs to another asset,
    /// `DomainError::Overflow` if the new price overflows the owned value.
    pub fn replace_coin(&mut self, coin: Coin) -> Result<(), DomainError> {
        if coin.id != self.id {
            return Err(DomainError::IdMismatch {
                holding: self.id.get(),
                incoming: coin.id.get(),
            });
        }
        let (value, change) = derive_values(&coin, self.owned_amount)?;
        self.coin = coin;
        self.value_in_fiat = value;
        self.value_change_24h_in_fiat = change;
        Ok(())
    }

    /// Sets (or clears) the user-owned amount
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` for negative amounts and
    /// `DomainError::Overflow` when the amount is too large to value.
    pub fn set_owned_amount(&mut self, amount: Option<Decimal>) -> Result<(), DomainError> {
        if let Some(value) = amount {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(DomainError::InvalidAmount(value.to_string()));
            }
        }
        let (value, change) = derive_values(&self.coin, amount)?;
        self.owned_amount = amount;
        self.value_in_fiat = value;
        self.value_change_24h_in_fiat = change;
        Ok(())
    }
}

/// `(value_in_fiat, value_change_24h_in_fiat)` for `amount` of `coin`
fn derive_values(
    coin: &Coin,
    amount: Option<Decimal>,
) -> Result<(Option<Decimal>, Option<Decimal>), DomainError> {
    let Some(amount) = amount else {
        return Ok((None, None));
    };
    let overflow = || {
        DomainError::Overflow(format!(
            "{} {} at {} {}",
            amount, coin.symbol, coin.price, coin.fiat_code
        ))
    };
    let value = amount.checked_mul(coin.price).ok_or_else(overflow)?;
    let change = value
        .checked_mul(coin.percent_change_24h)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(overflow)?;
    Ok((Some(value), Some(change)))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::coin::fixtures::coin;

    #[test]
    fn test_new_holding_has_no_values() {
        let holding = Holding::new(coin(1, 100));
        assert_eq!(holding.id(), CoinId::new(1));
        assert!(holding.owned_amount().is_none());
        assert!(holding.value_in_fiat().is_none());
        assert!(holding.value_change_24h_in_fiat().is_none());
    }

    #[test]
    fn test_values_derived_from_amount() {
        let holding = Holding::with_amount(coin(1, 100), Some(Decimal::from(2))).unwrap();
        assert_eq!(holding.value_in_fiat(), Some(Decimal::from(200)));
        // 10% of 200
        assert_eq!(holding.value_change_24h_in_fiat(), Some(Decimal::from(20)));
    }

    #[test]
    fn test_replace_coin_keeps_amount() {
        let mut holding = Holding::with_amount(coin(1, 100), Some(Decimal::from(2))).unwrap();
        holding.replace_coin(coin(1, 150)).unwrap();
        assert_eq!(holding.owned_amount(), Some(Decimal::from(2)));
        assert_eq!(holding.value_in_fiat(), Some(Decimal::from(300)));
    }

    #[test]
    fn test_replace_coin_rejects_other_id() {
        let mut holding = Holding::new(coin(1, 100));
        let err = holding.replace_coin(coin(2, 100)).unwrap_err();
        assert!(matches!(err, DomainError::IdMismatch { .. }));
        assert_eq!(holding.coin().id, CoinId::new(1));
    }

    #[test]
    fn test_set_owned_amount() {
        let mut holding = Holding::new(coin(1, 100));
        holding
            .set_owned_amount(Some(Decimal::from_str("0.5").unwrap()))
            .unwrap();
        assert_eq!(holding.value_in_fiat(), Some(Decimal::from(50)));

        holding.set_owned_amount(None).unwrap();
        assert!(holding.value_in_fiat().is_none());
        assert!(holding.value_change_24h_in_fiat().is_none());
    }

    #[test]
    fn test_set_owned_amount_rejects_negative() {
        let mut holding = Holding::with_amount(coin(1, 100), Some(Decimal::ONE)).unwrap();
        let result = holding.set_owned_amount(Some(Decimal::from(-1)));
        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
        assert_eq!(holding.owned_amount(), Some(Decimal::ONE));
    }

    #[test]
    fn test_zero_amount_is_allowed() {
        let mut holding = Holding::new(coin(1, 100));
        holding.set_owned_amount(Some(Decimal::ZERO)).unwrap();
        assert_eq!(holding.value_in_fiat(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_set_owned_amount_overflow_is_rejected() {
        let mut holding = Holding::with_amount(coin(1, 60000), Some(Decimal::ONE)).unwrap();
        let huge = Decimal::from_str("10000000000000000000000000").unwrap();

        let result = holding.set_owned_amount(Some(huge));
        assert!(matches!(result, Err(DomainError::Overflow(_))));
        assert_eq!(holding.owned_amount(), Some(Decimal::ONE));
        assert_eq!(holding.value_in_fiat(), Some(Decimal::from(60000)));
    }

    #[test]
    fn test_replace_coin_overflow_keeps_previous_snapshot() {
        let huge = Decimal::from_str("10000000000000000000000000").unwrap();
        let mut holding = Holding::with_amount(coin(1, 1), Some(huge)).unwrap();

        let result = holding.replace_coin(coin(1, 60000));
        assert!(matches!(result, Err(DomainError::Overflow(_))));
        assert_eq!(holding.coin().price, Decimal::ONE);
        assert_eq!(holding.value_in_fiat(), Some(huge));
    }

    #[test]
    fn test_with_amount_overflow_is_an_error() {
        let result = Holding::with_amount(coin(1, i64::MAX), Some(Decimal::MAX));
        assert!(matches!(result, Err(DomainError::Overflow(_))));
    }
}
