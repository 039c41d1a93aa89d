//! SQLite implementation of IMarketStore
//!
//! Reads go straight to the pool. Every write runs in one transaction and
//! announces the touched tables through the [`ChangeNotifier`] only after the
//! commit succeeded, which is what keeps live queries from ever observing a
//! partial batch.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, info};

use coinfolio_core::domain::{Coin, CoinId, Holding};
use coinfolio_core::ports::{CatalogReport, IMarketStore, LiveQuery, UpsertReport};

use crate::notify::{ChangeNotifier, Table};
use crate::reconciler::{self, read_holding, update_holding_amount, write_full_holding};
use crate::rows::{coin_from_row, holding_from_row, sort_holdings};
use crate::CacheError;

/// SQLite-based implementation of the market store port
///
/// Cloning is cheap and clones share both the pool and the notifier, so a
/// write through one clone wakes live queries opened on another.
#[derive(Clone)]
pub struct SqliteMarketStore {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl SqliteMarketStore {
    /// Creates a new store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Returns the notifier that announces this store's commits
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

// ============================================================================
// Live query loaders
// ============================================================================

async fn load_catalog(pool: SqlitePool) -> anyhow::Result<Vec<Coin>> {
    let rows = sqlx::query("SELECT * FROM catalog ORDER BY rank, id")
        .fetch_all(&pool)
        .await
        .map_err(CacheError::from)?;
    Ok(rows
        .iter()
        .map(coin_from_row)
        .collect::<Result<Vec<_>, _>>()?)
}

async fn load_holdings(pool: SqlitePool) -> anyhow::Result<Vec<Holding>> {
    let rows = sqlx::query("SELECT * FROM holdings")
        .fetch_all(&pool)
        .await
        .map_err(CacheError::from)?;
    let mut holdings = rows
        .iter()
        .map(holding_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    sort_holdings(&mut holdings);
    Ok(holdings)
}

// ============================================================================
// IMarketStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMarketStore for SqliteMarketStore {
    fn observe_catalog(&self) -> LiveQuery<Vec<Coin>> {
        self.notifier
            .live_query(self.pool.clone(), Table::Catalog, load_catalog)
    }

    fn observe_holdings(&self) -> LiveQuery<Vec<Holding>> {
        self.notifier
            .live_query(self.pool.clone(), Table::Holdings, load_holdings)
    }

    async fn get_coin(&self, id: CoinId) -> anyhow::Result<Option<Coin>> {
        let row = sqlx::query("SELECT * FROM catalog WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(CacheError::from)?;
        Ok(row.as_ref().map(coin_from_row).transpose()?)
    }

    async fn get_holding(&self, id: CoinId) -> anyhow::Result<Option<Holding>> {
        let mut conn = self.pool.acquire().await.map_err(CacheError::from)?;
        Ok(read_holding(&mut conn, id).await?)
    }

    async fn holding_ids(&self) -> anyhow::Result<Vec<CoinId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM holdings ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(CacheError::from)?;
        let ids = ids
            .into_iter()
            .map(|id| {
                CoinId::try_from(id)
                    .map_err(|e| CacheError::SerializationError(format!("Invalid CoinId: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    async fn save_catalog(&self, coins: &[Coin]) -> anyhow::Result<CatalogReport> {
        if coins.is_empty() {
            let mut conn = self.pool.acquire().await.map_err(CacheError::from)?;
            return Ok(reconciler::reload_catalog(&mut conn, coins).await?);
        }

        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        let report = reconciler::reload_catalog(&mut tx, coins).await?;
        tx.commit().await.map_err(CacheError::from)?;

        self.notifier.notify(Table::Catalog);
        if report.holdings_refreshed > 0 {
            self.notifier.notify(Table::Holdings);
        }

        info!(
            catalog_rows = report.catalog_rows,
            holdings_refreshed = report.holdings_refreshed,
            delisted = report.delisted.len(),
            "Catalog saved"
        );
        Ok(report)
    }

    async fn upsert_holdings(&self, coins: &[Coin]) -> anyhow::Result<UpsertReport> {
        if coins.is_empty() {
            debug!("Empty holdings batch, nothing to upsert");
            return Ok(UpsertReport::default());
        }

        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        let report = reconciler::upsert_holdings(&mut tx, coins).await?;
        tx.commit().await.map_err(CacheError::from)?;

        self.notifier.notify(Table::Holdings);

        info!(
            inserted = report.inserted(),
            updated = report.updated(),
            "Holdings saved"
        );
        Ok(report)
    }

    async fn set_owned_amount(
        &self,
        id: CoinId,
        amount: Option<Decimal>,
    ) -> anyhow::Result<Option<Holding>> {
        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        let Some(mut holding) = read_holding(&mut tx, id).await? else {
            return Ok(None);
        };
        holding.set_owned_amount(amount).map_err(CacheError::from)?;
        update_holding_amount(&mut tx, &holding).await?;
        tx.commit().await.map_err(CacheError::from)?;

        self.notifier.notify(Table::Holdings);
        debug!(%id, ?amount, "Owned amount updated");
        Ok(Some(holding))
    }

    async fn delete_holdings(&self, ids: &[CoinId]) -> anyhow::Result<Vec<Holding>> {
        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(holding) = read_holding(&mut tx, *id).await? {
                sqlx::query("DELETE FROM holdings WHERE id = ?")
                    .bind(id.as_i64())
                    .execute(&mut *tx)
                    .await
                    .map_err(CacheError::from)?;
                removed.push(holding);
            }
        }
        tx.commit().await.map_err(CacheError::from)?;

        if !removed.is_empty() {
            self.notifier.notify(Table::Holdings);
        }
        info!(requested = ids.len(), removed = removed.len(), "Holdings removed");
        Ok(removed)
    }

    async fn restore_holdings(&self, holdings: &[Holding]) -> anyhow::Result<()> {
        if holdings.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        for holding in holdings {
            write_full_holding(&mut tx, holding).await?;
        }
        tx.commit().await.map_err(CacheError::from)?;

        self.notifier.notify(Table::Holdings);
        info!(restored = holdings.len(), "Holdings restored");
        Ok(())
    }
}
