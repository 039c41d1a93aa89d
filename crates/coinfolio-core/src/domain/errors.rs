//! Domain error types
//!
//! This module defines the validation errors raised by domain constructors
//! and the failure taxonomy of a synchronization cycle.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Fiat (or quote) currency code is malformed
    #[error("Invalid currency code: {0}")]
    InvalidFiatCode(String),

    /// Coin identifier could not be parsed
    #[error("Invalid coin ID: {0}")]
    InvalidCoinId(String),

    /// Owned amounts cannot be negative
    #[error("Invalid owned amount: {0}")]
    InvalidAmount(String),

    /// A holding was asked to embed a coin with a different id
    #[error("Coin {incoming} cannot replace the snapshot of holding {holding}")]
    IdMismatch {
        /// Id of the holding being updated
        holding: u32,
        /// Id carried by the incoming coin
        incoming: u32,
    },

    /// A derived value does not fit the decimal range
    #[error("Value overflow: {0}")]
    Overflow(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Why a synchronization cycle could not deliver fresh data
///
/// Transport and server errors come from the market adapter, persistence
/// failures from the store adapter. `EmptyResponse` is listed for
/// completeness: the engine treats it as a successful cycle without data,
/// never as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncFailure {
    /// Transport-level failure (connection refused, timeout, malformed body)
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Non-2xx response carrying a structured error body
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Provider-specific error code from the envelope, if any
        code: Option<i64>,
        /// Human-readable message from the envelope
        message: String,
    },

    /// HTTP 204 / no content
    #[error("Empty response")]
    EmptyResponse,

    /// The store transaction could not commit
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidFiatCode("us".to_string());
        assert_eq!(err.to_string(), "Invalid currency code: us");

        let err = DomainError::IdMismatch {
            holding: 1,
            incoming: 2,
        };
        assert_eq!(
            err.to_string(),
            "Coin 2 cannot replace the snapshot of holding 1"
        );
    }

    #[test]
    fn test_sync_failure_display() {
        let err = SyncFailure::ServerError {
            status: 401,
            code: Some(1002),
            message: "API key missing.".to_string(),
        };
        assert_eq!(err.to_string(), "Server error 401: API key missing.");

        let err = SyncFailure::NetworkFailure("connection refused".to_string());
        assert_eq!(err.to_string(), "Network failure: connection refused");
    }

    #[test]
    fn test_error_equality() {
        let err1 = SyncFailure::PersistenceFailure("locked".to_string());
        let err2 = SyncFailure::PersistenceFailure("locked".to_string());
        assert_eq!(err1, err2);
        assert_ne!(err1, SyncFailure::EmptyResponse);
    }
}
