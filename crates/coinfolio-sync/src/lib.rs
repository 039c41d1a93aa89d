//! Coinfolio Sync - Cache-first synchronization engine
//!
//! Provides:
//! - A state machine that serves the local store first, refreshes it from
//!   the market source at most once per cycle, and keeps streaming the store
//! - The two bound resources the application reads: the coin catalog and
//!   the user's holdings in a chosen quote currency
//! - User edits on holdings (add, set amount, remove with undo)
//!
//! ## Modules
//!
//! - [`engine`] - Sync engine, observations and the retry-capable consumer
//! - [`resources`] - Catalog and holdings bindings over the store and source ports
//! - [`throttle`] - Per-key freshness window for catalog refreshes
//! - [`portfolio`] - User edits on the holdings table

pub mod engine;
pub mod portfolio;
pub mod resources;
pub mod throttle;

pub use engine::{BoundResource, LiveResource, Observation, SyncEngine};
pub use portfolio::Portfolio;
pub use resources::{CatalogResource, HoldingsResource, Session};
pub use throttle::FetchThrottle;

use coinfolio_core::domain::{CoinId, DomainError};
use thiserror::Error;

/// Errors returned by user edits
///
/// The sync engine itself never returns errors; failures of a cycle are
/// emitted as `Resource` values.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The coin is not present in the local catalog
    #[error("Coin {0} is not in the catalog; refresh the catalog first")]
    NotInCatalog(CoinId),

    /// No holding exists for this coin
    #[error("No holding for coin {0}")]
    NotHeld(CoinId),

    /// A domain rule rejected the edit
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// The local store failed
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
