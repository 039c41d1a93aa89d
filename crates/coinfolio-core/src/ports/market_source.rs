//! Market source port (driven/secondary port)
//!
//! This module defines the interface for fetching market data from a remote
//! provider. The primary implementation targets a CoinMarketCap-compatible
//! JSON API, but the trait only speaks in domain types.
//!
//! ## Design Notes
//!
//! - Operations return [`ApiResponse`] instead of `Result`: "no content" is a
//!   legitimate third outcome that the sync engine handles differently from
//!   both success and failure.
//! - Request timeouts and retry-on-connection-failure are transport concerns
//!   configured once in the adapter, never by the caller.

use crate::domain::{Coin, CoinId, FiatCode, SyncFailure};

/// Outcome of one remote call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    /// Parsed body
    Success(T),
    /// The provider answered with no content (HTTP 204)
    Empty,
    /// Transport, server or decoding failure
    Error(SyncFailure),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    /// Maps the success body
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success(body) => ApiResponse::Success(f(body)),
            ApiResponse::Empty => ApiResponse::Empty,
            ApiResponse::Error(failure) => ApiResponse::Error(failure),
        }
    }
}

impl<T, E: Into<SyncFailure>> From<Result<Option<T>, E>> for ApiResponse<T> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(body)) => ApiResponse::Success(body),
            Ok(None) => ApiResponse::Empty,
            Err(e) => ApiResponse::Error(e.into()),
        }
    }
}

/// Port trait for the remote market data provider
///
/// Every operation is parameterized by the quote currency; all coins of one
/// successful response carry the same `fetched_at`.
#[async_trait::async_trait]
pub trait IMarketSource: Send + Sync {
    /// Latest listings ordered by rank, at most `limit` coins
    async fn latest_listings(&self, fiat: &FiatCode, limit: u32) -> ApiResponse<Vec<Coin>>;

    /// Latest quotes for exactly the given ids
    async fn quotes(&self, fiat: &FiatCode, ids: &[CoinId]) -> ApiResponse<Vec<Coin>>;
}
