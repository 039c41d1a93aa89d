//! Coherence checks for cached batches
//!
//! A batch fetched in one response shares a single fetch epoch and a single
//! quote currency. When either differs across rows (a partial write, an older
//! row that was not part of the last response, a currency switch), the batch
//! cannot be trusted without a refresh.

use chrono::{DateTime, Utc};

use super::coin::Coin;
use super::holding::Holding;
use super::newtypes::FiatCode;

/// A row that carries a market snapshot
pub trait Quoted {
    fn fetched_at(&self) -> DateTime<Utc>;
    fn fiat_code(&self) -> &FiatCode;
}

impl Quoted for Coin {
    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    fn fiat_code(&self) -> &FiatCode {
        &self.fiat_code
    }
}

impl Quoted for Holding {
    fn fetched_at(&self) -> DateTime<Utc> {
        self.coin().fetched_at
    }

    fn fiat_code(&self) -> &FiatCode {
        &self.coin().fiat_code
    }
}

/// Returns true iff the batch is non-empty and every row shares the first
/// row's fetch timestamp
///
/// An empty batch is "unknown" and reported as incoherent so the caller
/// refreshes.
pub fn is_coherent<T: Quoted>(batch: &[T]) -> bool {
    match batch.split_first() {
        Some((first, rest)) => {
            let epoch = first.fetched_at();
            rest.iter().all(|row| row.fetched_at() == epoch)
        }
        None => false,
    }
}

/// Returns true iff every row is priced in `target`
///
/// Vacuously true for an empty batch; pair it with [`is_coherent`] when
/// emptiness must force a refresh.
pub fn is_same_currency<T: Quoted>(batch: &[T], target: &FiatCode) -> bool {
    batch.iter().all(|row| row.fiat_code() == target)
}
