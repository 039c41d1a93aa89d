//! Domain entities and business logic
//!
//! This module contains the core domain types for Coinfolio:
//! - Newtypes for coin identifiers and fiat currency codes
//! - Remote-origin market data (`Coin`) and user-owned holdings (`Holding`)
//! - The `Resource` snapshot emitted by the synchronization engine
//! - Coherence checks that decide whether a cached batch is trustworthy
//! - The reconciliation planner that merges remote batches into local rows
//! - Domain-specific error types

pub mod coherence;
pub mod coin;
pub mod errors;
pub mod holding;
pub mod newtypes;
pub mod portfolio;
pub mod reconcile;
pub mod resource;

// Re-export commonly used types
pub use coherence::{is_coherent, is_same_currency, Quoted};
pub use coin::Coin;
pub use errors::{DomainError, SyncFailure};
pub use holding::Holding;
pub use newtypes::{CoinId, FiatCode};
pub use portfolio::PortfolioSummary;
pub use reconcile::{apply_catalog, merge_remote, reconcile, CatalogMerge, Reconciliation};
pub use resource::{Resource, Status};
