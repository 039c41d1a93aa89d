//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IMarketStore`] - Transactional local store for the catalog and holdings
//!   tables, queried as live sequences
//! - [`IMarketSource`] - Remote market data provider, one operation per data need

pub mod market_source;
pub mod market_store;

pub use market_source::{ApiResponse, IMarketSource};
pub use market_store::{CatalogReport, IMarketStore, LiveQuery, UpsertOutcome, UpsertReport};
