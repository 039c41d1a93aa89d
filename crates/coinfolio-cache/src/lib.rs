//! Coinfolio Cache - Local market data persistence
//!
//! SQLite-based store for:
//! - The coin catalog (every listed coin, reloaded per refresh)
//! - Holdings (coins the user tracks, with owned amounts)
//!
//! ## Architecture
//!
//! This crate implements the `IMarketStore` port from `coinfolio-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteMarketStore`] - Full `IMarketStore` implementation
//! - [`ChangeNotifier`] - Commit notifications that drive live queries
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use coinfolio_cache::{DatabasePool, SqliteMarketStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/coinfolio/coinfolio.db")).await?;
//! let store = SqliteMarketStore::new(pool.pool().clone());
//! // Use store as IMarketStore...
//! # Ok(())
//! # }
//! ```

pub mod notify;
pub mod pool;
pub mod reconciler;
pub mod repository;
mod rows;

pub use notify::{ChangeNotifier, Table};
pub use pool::DatabasePool;
pub use repository::SqliteMarketStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be converted back into a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A write violated a domain rule and was rolled back
    #[error("Rejected write: {0}")]
    Rejected(#[from] coinfolio_core::domain::DomainError),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
