//! User edits on holdings
//!
//! Everything here goes through the store's transactional writes, so live
//! holdings observations pick the edits up like any other commit.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use coinfolio_core::domain::{CoinId, DomainError, Holding};
use coinfolio_core::ports::IMarketStore;

use crate::SyncError;

/// Holdings edits over a market store
#[derive(Clone)]
pub struct Portfolio {
    store: Arc<dyn IMarketStore>,
}

impl Portfolio {
    pub fn new(store: Arc<dyn IMarketStore>) -> Self {
        Self { store }
    }

    /// Starts tracking a catalog coin
    ///
    /// Re-adding a held coin refreshes its snapshot and keeps its amount.
    pub async fn add_holding(&self, id: CoinId) -> Result<Holding, SyncError> {
        let coin = self
            .store
            .get_coin(id)
            .await?
            .ok_or(SyncError::NotInCatalog(id))?;
        self.store
            .upsert_holdings(std::slice::from_ref(&coin))
            .await
            .map_err(store_error)?;
        let holding = self
            .store
            .get_holding(id)
            .await?
            .ok_or(SyncError::NotHeld(id))?;
        info!(%id, symbol = %coin.symbol, "Holding added");
        Ok(holding)
    }

    /// Sets (or clears with `None`) the owned amount of a holding
    pub async fn set_owned_amount(
        &self,
        id: CoinId,
        amount: Option<Decimal>,
    ) -> Result<Holding, SyncError> {
        if let Some(a) = amount.filter(|a| *a < Decimal::ZERO) {
            return Err(DomainError::InvalidAmount(a.to_string()).into());
        }
        self.store
            .set_owned_amount(id, amount)
            .await
            .map_err(store_error)?
            .ok_or(SyncError::NotHeld(id))
    }

    /// Removes holdings; keep the result to undo with [`Portfolio::restore`]
    pub async fn remove(&self, ids: &[CoinId]) -> Result<Vec<Holding>, SyncError> {
        Ok(self.store.delete_holdings(ids).await?)
    }

    /// Re-inserts holdings returned by [`Portfolio::remove`]
    pub async fn restore(&self, removed: &[Holding]) -> Result<(), SyncError> {
        Ok(self.store.restore_holdings(removed).await?)
    }
}

/// Surfaces a domain rule the store rejected the write with
fn store_error(error: anyhow::Error) -> SyncError {
    match error
        .chain()
        .find_map(|cause| cause.downcast_ref::<DomainError>())
    {
        Some(rejected) => SyncError::DomainError(rejected.clone()),
        None => SyncError::Store(error),
    }
}
