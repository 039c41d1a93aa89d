//! Per-key freshness window
//!
//! Decides whether a cached value keyed by e.g. its quote currency is old
//! enough to refresh. Checking never records anything: a key is marked once
//! its refreshed value is committed, so a cycle cancelled mid-fetch leaves
//! the key due and a failed fetch resets it.

use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use tracing::trace;

/// Tracks when each key was last refreshed
#[derive(Debug)]
pub struct FetchThrottle {
    window: Duration,
    last_fetch: DashMap<String, Instant>,
}

impl FetchThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fetch: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if `key` was never refreshed or its window elapsed
    pub fn is_due(&self, key: &str) -> bool {
        let due = self
            .last_fetch
            .get(key)
            .map_or(true, |last| last.elapsed() >= self.window);
        trace!(key, due, "Throttle checked");
        due
    }

    /// Records a committed refresh of `key`
    pub fn mark_fetched(&self, key: &str) {
        self.last_fetch.insert(key.to_string(), Instant::now());
        trace!(key, "Throttle marked");
    }

    /// Forgets `key`, so the next check is due
    pub fn reset(&self, key: &str) {
        self.last_fetch.remove(key);
        trace!(key, "Throttle reset");
    }
}
