//! Commit notifications and live queries
//!
//! SQLite has no change feed usable across pooled connections, so the store
//! announces its own commits: every write transaction publishes the tables it
//! touched on a broadcast channel *after* commit. A live query subscribes
//! before running its first query, then re-runs the query on each matching
//! notification. Notifications that pile up while a query runs are coalesced
//! into one re-query, so subscribers always read the latest committed rows.

use std::future::Future;

use futures_util::stream::{self, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::trace;

use coinfolio_core::ports::LiveQuery;

/// Notification buffer; lagging subscribers re-query instead of failing
const CHANNEL_CAPACITY: usize = 64;

/// Persisted tables that can be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Catalog,
    Holdings,
}

/// Publishes committed table changes to live queries
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<Table>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Announces a committed write to `table`
    pub fn notify(&self, table: Table) {
        // No receivers simply means nobody is observing
        let receivers = self.tx.send(table).unwrap_or(0);
        trace!(?table, receivers, "Published table change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }

    /// Builds a live query over `table`
    ///
    /// The stream yields the result of `load` immediately, then once per
    /// (coalesced) committed change to `table`. It ends when the notifier is
    /// dropped, and the subscription ends when the stream is dropped.
    pub fn live_query<T, F, Fut>(&self, pool: SqlitePool, table: Table, load: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(SqlitePool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        // Subscribe before the first read so no commit can slip in between
        let rx = self.subscribe();

        stream::unfold(
            (pool, rx, load, true),
            move |(pool, mut rx, load, first)| async move {
                if !first && !wait_for_change(&mut rx, table).await {
                    return None;
                }
                let result = load(pool.clone()).await;
                Some((result, (pool, rx, load, false)))
            },
        )
        .boxed()
    }
}

/// Waits for the next change to `table`, then drains any queued notifications
///
/// Returns false once the notifier is gone.
async fn wait_for_change(rx: &mut broadcast::Receiver<Table>, table: Table) -> bool {
    loop {
        match rx.recv().await {
            Ok(changed) if changed == table => break,
            Ok(_) => continue,
            // Missed notifications: re-query to catch up
            Err(RecvError::Lagged(skipped)) => {
                trace!(?table, skipped, "Live query lagged");
                break;
            }
            Err(RecvError::Closed) => return false,
        }
    }

    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Closed) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;

    async fn count(pool: SqlitePool) -> anyhow::Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM catalog")
            .fetch_one(&pool)
            .await?)
    }

    #[tokio::test]
    async fn test_live_query_emits_initial_value() {
        let db = DatabasePool::in_memory().await.unwrap();
        let notifier = ChangeNotifier::new();
        let mut live = notifier.live_query(db.pool().clone(), Table::Catalog, count);

        assert_eq!(live.next().await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_live_query_requeries_on_matching_change() {
        let db = DatabasePool::in_memory().await.unwrap();
        let notifier = ChangeNotifier::new();
        let mut live = notifier.live_query(db.pool().clone(), Table::Catalog, count);
        assert_eq!(live.next().await.unwrap().unwrap(), 0);

        sqlx::query(
            "INSERT INTO catalog VALUES (1, 'Bitcoin', 'BTC', 1, 'USD', '1', '0', '0', '0', '2026-03-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        notifier.notify(Table::Holdings);
        notifier.notify(Table::Catalog);
        notifier.notify(Table::Catalog);

        assert_eq!(live.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_coalesces_queued_notifications() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        notifier.notify(Table::Catalog);
        notifier.notify(Table::Catalog);
        notifier.notify(Table::Catalog);

        assert!(wait_for_change(&mut rx, Table::Catalog).await);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_live_query_ends_when_notifier_dropped() {
        let db = DatabasePool::in_memory().await.unwrap();
        let notifier = ChangeNotifier::new();
        let mut live = notifier.live_query(db.pool().clone(), Table::Catalog, count);
        assert!(live.next().await.is_some());

        drop(notifier);
        assert!(live.next().await.is_none());
    }
}
