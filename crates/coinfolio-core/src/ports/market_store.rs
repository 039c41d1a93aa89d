//! Market store port (driven/secondary port)
//!
//! This module defines the interface for the transactional local store that
//! holds the two persisted tables: the catalog (every known coin) and the
//! holdings (coins the user tracks, each embedding a full coin snapshot).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory, etc.) and don't need domain-level classification.
//! - Live queries are streams: the first item is the current row set, and a
//!   new item follows every committed write to the queried table. Dropping
//!   the stream ends the subscription.
//! - Every multi-row write is atomic. Observers see either the whole batch or
//!   none of it.

use futures_util::stream::BoxStream;

use crate::domain::{Coin, CoinId, Holding};

/// Live sequence of query results
pub type LiveQuery<T> = BoxStream<'static, anyhow::Result<T>>;

/// Per-row outcome of an insert-ignore upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The row did not exist and was inserted with no owned amount
    Inserted,
    /// The row existed; its remote-origin fields were overwritten
    Updated,
}

/// Result of [`IMarketStore::upsert_holdings`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub outcomes: Vec<(CoinId, UpsertOutcome)>,
}

impl UpsertReport {
    pub fn inserted(&self) -> usize {
        self.count(UpsertOutcome::Inserted)
    }

    pub fn updated(&self) -> usize {
        self.count(UpsertOutcome::Updated)
    }

    fn count(&self, outcome: UpsertOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Result of [`IMarketStore::save_catalog`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    /// Rows now in the catalog table
    pub catalog_rows: usize,
    /// Holdings whose embedded coin was refreshed
    pub holdings_refreshed: usize,
    /// Holdings whose coin is no longer listed (left stale)
    pub delisted: Vec<CoinId>,
}

/// Port trait for the local market data store
#[async_trait::async_trait]
pub trait IMarketStore: Send + Sync {
    // --- Live queries ---

    /// Catalog rows ordered by rank
    fn observe_catalog(&self) -> LiveQuery<Vec<Coin>>;

    /// Holdings ordered by value (largest first), then rank
    fn observe_holdings(&self) -> LiveQuery<Vec<Holding>>;

    // --- Reads ---

    /// Reads one catalog row
    async fn get_coin(&self, id: CoinId) -> anyhow::Result<Option<Coin>>;

    /// Reads one holding
    async fn get_holding(&self, id: CoinId) -> anyhow::Result<Option<Holding>>;

    /// Ids of every holding, ascending
    async fn holding_ids(&self) -> anyhow::Result<Vec<CoinId>>;

    // --- Reconciling writes ---

    /// Reloads the catalog table and refreshes existing holdings from it, in
    /// one transaction
    ///
    /// An empty batch is a no-op: existing rows are never cleared.
    async fn save_catalog(&self, coins: &[Coin]) -> anyhow::Result<CatalogReport>;

    /// Upserts holdings from a remote batch, in one transaction
    ///
    /// New ids are inserted with no owned amount; existing ids get their
    /// remote-origin fields overwritten while the owned amount is preserved.
    async fn upsert_holdings(&self, coins: &[Coin]) -> anyhow::Result<UpsertReport>;

    // --- User edits ---

    /// Sets or clears the owned amount of an existing holding
    ///
    /// Returns the updated holding, or `None` if no holding has this id.
    async fn set_owned_amount(
        &self,
        id: CoinId,
        amount: Option<rust_decimal::Decimal>,
    ) -> anyhow::Result<Option<Holding>>;

    /// Removes holdings and returns the removed rows so the caller can undo
    async fn delete_holdings(&self, ids: &[CoinId]) -> anyhow::Result<Vec<Holding>>;

    /// Re-inserts previously removed holdings verbatim
    async fn restore_holdings(&self, holdings: &[Holding]) -> anyhow::Result<()>;
}
