//! Synchronized read snapshots
//!
//! A [`Resource`] is one value in the ordered sequence an observation emits:
//! the data currently available plus where it came from. Resources are created
//! by the sync engine per subscription and never persisted.

use serde::Serialize;

/// Origin of a resource value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Status {
    /// No authoritative value yet; `data` is either absent or stale cache
    Loading,
    /// Served from the local store without a network refresh
    SuccessFromCache,
    /// Served from the local store after a successful refresh was persisted
    SuccessFromNetwork,
    /// The refresh failed; `data` still carries the last known cache value
    Error(String),
}

/// Status plus payload describing one snapshot of a synchronized read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource<T> {
    pub status: Status,
    pub data: Option<T>,
}

impl<T> Resource<T> {
    pub fn loading(data: Option<T>) -> Self {
        Self {
            status: Status::Loading,
            data,
        }
    }

    pub fn from_cache(data: T) -> Self {
        Self {
            status: Status::SuccessFromCache,
            data: Some(data),
        }
    }

    pub fn from_network(data: T) -> Self {
        Self {
            status: Status::SuccessFromNetwork,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: Status::Error(message.into()),
            data,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, Status::Loading)
    }

    /// True for both cache and network successes
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            Status::SuccessFromCache | Status::SuccessFromNetwork
        )
    }

    /// Error message, if this is an error snapshot
    pub fn message(&self) -> Option<&str> {
        match &self.status {
            Status::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Maps the payload, keeping the status
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        Resource {
            status: self.status,
            data: self.data.map(f),
        }
    }
}
