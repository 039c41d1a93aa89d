//! Coinfolio Market - Market data HTTP client
//!
//! Provides an async client for a CoinMarketCap-compatible JSON API:
//! - Latest listings, ordered by rank, in any quote currency
//! - Latest quotes for an explicit id list
//!
//! ## Modules
//!
//! - [`client`] - Typed HTTP client with retry and envelope parsing
//! - [`provider`] - `IMarketSource` implementation on top of the client
//! - [`rate_limit`] - `Retry-After` parsing and reconnect backoff
//! - [`wire`] - Response DTOs and their conversion into domain coins

pub mod client;
pub mod provider;
pub mod rate_limit;
pub mod wire;

use std::time::Duration;

use coinfolio_core::domain::SyncFailure;
use thiserror::Error;

pub use client::MarketClient;
pub use provider::CoinMarketCapSource;

/// Errors that can occur when communicating with the market data API
#[derive(Debug, Error)]
pub enum MarketError {
    /// The API key is missing, invalid or lacks the required plan
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code (401 or 403)
        status: u16,
        /// Message from the error envelope
        message: String,
    },

    /// Rate limit exceeded and every retry was spent
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait
        retry_after: Duration,
    },

    /// Any other non-2xx answer
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Provider error code from the envelope, if present
        code: Option<i64>,
        /// Message from the envelope, or the status reason
        message: String,
    },

    /// A network-level error occurred (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<MarketError> for SyncFailure {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Unauthorized { status, message } => SyncFailure::ServerError {
                status,
                code: None,
                message,
            },
            MarketError::TooManyRequests { retry_after } => SyncFailure::ServerError {
                status: 429,
                code: None,
                message: format!(
                    "Too many requests, retry after {}s",
                    retry_after.as_secs()
                ),
            },
            MarketError::Server {
                status,
                code,
                message,
            } => SyncFailure::ServerError {
                status,
                code,
                message,
            },
            MarketError::Network(e) => SyncFailure::NetworkFailure(e.to_string()),
            MarketError::InvalidResponse(msg) => {
                SyncFailure::NetworkFailure(format!("Invalid response: {}", msg))
            }
        }
    }
}
