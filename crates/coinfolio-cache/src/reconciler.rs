//! Transactional execution of the upsert/merge algorithm
//!
//! Every function here takes the connection of an open transaction; the
//! caller commits. A failure anywhere returns an error and the dropped
//! transaction rolls back, so no observer ever sees a half-merged batch.
//!
//! What to write is decided by `coinfolio_core::domain::reconcile`; this
//! module only turns those decisions into SQL.

use std::collections::HashSet;

use sqlx::SqliteConnection;
use tracing::debug;

use coinfolio_core::domain::{apply_catalog, merge_remote, reconcile, Coin, CoinId, Holding};
use coinfolio_core::ports::{CatalogReport, UpsertOutcome, UpsertReport};

use crate::rows::{holding_from_row, optional_decimal, CoinBinds, COIN_COLUMNS};
use crate::CacheError;

// ============================================================================
// Statement helpers
// ============================================================================

/// Binds a coin's columns, in [`COIN_COLUMNS`] order, onto `sql` and runs it
async fn execute_coin(
    conn: &mut SqliteConnection,
    sql: &str,
    coin: &Coin,
) -> Result<u64, CacheError> {
    let b = CoinBinds::from(coin);
    let result = sqlx::query(sql)
        .bind(b.id)
        .bind(b.name)
        .bind(b.symbol)
        .bind(b.rank)
        .bind(b.fiat_code)
        .bind(b.price)
        .bind(b.change_1h)
        .bind(b.change_24h)
        .bind(b.change_7d)
        .bind(b.fetched_at)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Rewrites the coin snapshot and derived values of one holding
///
/// `owned_amount` is deliberately absent from the statement.
async fn update_holding_snapshot(
    conn: &mut SqliteConnection,
    holding: &Holding,
) -> Result<(), CacheError> {
    let b = CoinBinds::from(holding.coin());
    sqlx::query(
        "UPDATE holdings SET name = ?, symbol = ?, rank = ?, fiat_code = ?, price = ?, \
         percent_change_1h = ?, percent_change_24h = ?, percent_change_7d = ?, fetched_at = ?, \
         value_in_fiat = ?, value_change_24h_in_fiat = ? \
         WHERE id = ?",
    )
    .bind(b.name)
    .bind(b.symbol)
    .bind(b.rank)
    .bind(b.fiat_code)
    .bind(b.price)
    .bind(b.change_1h)
    .bind(b.change_24h)
    .bind(b.change_7d)
    .bind(b.fetched_at)
    .bind(optional_decimal(holding.value_in_fiat()))
    .bind(optional_decimal(holding.value_change_24h_in_fiat()))
    .bind(b.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes the amount and derived values of one holding
pub(crate) async fn update_holding_amount(
    conn: &mut SqliteConnection,
    holding: &Holding,
) -> Result<(), CacheError> {
    sqlx::query(
        "UPDATE holdings SET owned_amount = ?, value_in_fiat = ?, value_change_24h_in_fiat = ? \
         WHERE id = ?",
    )
    .bind(optional_decimal(holding.owned_amount()))
    .bind(optional_decimal(holding.value_in_fiat()))
    .bind(optional_decimal(holding.value_change_24h_in_fiat()))
    .bind(holding.id().as_i64())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes a complete holdings row, replacing any existing one
pub(crate) async fn write_full_holding(
    conn: &mut SqliteConnection,
    holding: &Holding,
) -> Result<(), CacheError> {
    let b = CoinBinds::from(holding.coin());
    let sql = format!(
        "INSERT OR REPLACE INTO holdings ({COIN_COLUMNS}, owned_amount, value_in_fiat, \
         value_change_24h_in_fiat) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(&sql)
        .bind(b.id)
        .bind(b.name)
        .bind(b.symbol)
        .bind(b.rank)
        .bind(b.fiat_code)
        .bind(b.price)
        .bind(b.change_1h)
        .bind(b.change_24h)
        .bind(b.change_7d)
        .bind(b.fetched_at)
        .bind(optional_decimal(holding.owned_amount()))
        .bind(optional_decimal(holding.value_in_fiat()))
        .bind(optional_decimal(holding.value_change_24h_in_fiat()))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn read_holding(
    conn: &mut SqliteConnection,
    id: CoinId,
) -> Result<Option<Holding>, CacheError> {
    let row = sqlx::query("SELECT * FROM holdings WHERE id = ?")
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(holding_from_row).transpose()
}

pub(crate) async fn read_all_holdings(
    conn: &mut SqliteConnection,
) -> Result<Vec<Holding>, CacheError> {
    let rows = sqlx::query("SELECT * FROM holdings")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(holding_from_row).collect()
}

// ============================================================================
// Catalog reload
// ============================================================================

/// Reloads the catalog table and refreshes existing holdings from it
///
/// An empty batch leaves every row untouched.
pub async fn reload_catalog(
    conn: &mut SqliteConnection,
    coins: &[Coin],
) -> Result<CatalogReport, CacheError> {
    if coins.is_empty() {
        debug!("Empty catalog batch, keeping existing rows");
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog")
            .fetch_one(&mut *conn)
            .await?;
        return Ok(CatalogReport {
            catalog_rows: rows as usize,
            ..CatalogReport::default()
        });
    }

    sqlx::query("DELETE FROM catalog")
        .execute(&mut *conn)
        .await?;

    let insert = format!(
        "INSERT OR REPLACE INTO catalog ({COIN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    for coin in coins {
        execute_coin(conn, &insert, coin).await?;
    }

    let holdings = read_all_holdings(conn).await?;
    let merge = apply_catalog(&holdings, coins)?;
    for holding in &merge.updated {
        update_holding_snapshot(conn, holding).await?;
    }

    let catalog_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog")
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        catalog_rows,
        holdings_refreshed = merge.updated.len(),
        delisted = merge.delisted.len(),
        "Catalog reloaded"
    );

    Ok(CatalogReport {
        catalog_rows: catalog_rows as usize,
        holdings_refreshed: merge.updated.len(),
        delisted: merge.delisted,
    })
}

// ============================================================================
// Holdings upsert
// ============================================================================

/// Two-phase upsert of a remote batch into the holdings table
///
/// 1. New ids are inserted with "ignore on conflict" and no owned amount.
/// 2. Every other row (including inserts the store rejected) is read back,
///    merged with [`merge_remote`] and written individually.
pub async fn upsert_holdings(
    conn: &mut SqliteConnection,
    coins: &[Coin],
) -> Result<UpsertReport, CacheError> {
    if coins.is_empty() {
        return Ok(UpsertReport::default());
    }

    let existing: Vec<i64> = sqlx::query_scalar("SELECT id FROM holdings")
        .fetch_all(&mut *conn)
        .await?;
    let existing_keys: HashSet<CoinId> = existing
        .into_iter()
        .filter_map(|id| CoinId::try_from(id).ok())
        .collect();

    let plan = reconcile(coins, &existing_keys);
    let mut report = UpsertReport::default();
    let mut to_update: Vec<&Coin> = Vec::with_capacity(plan.to_update.len());

    let insert = format!(
        "INSERT OR IGNORE INTO holdings ({COIN_COLUMNS}, owned_amount, value_in_fiat, \
         value_change_24h_in_fiat) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL)"
    );
    for coin in &plan.to_insert {
        if execute_coin(conn, &insert, coin).await? == 0 {
            to_update.push(coin);
        } else {
            report.outcomes.push((coin.id, UpsertOutcome::Inserted));
        }
    }
    to_update.extend(plan.to_update.iter());

    for coin in to_update {
        let Some(current) = read_holding(conn, coin.id).await? else {
            continue;
        };
        let merged = merge_remote(&current, coin)?;
        update_holding_snapshot(conn, &merged).await?;
        report.outcomes.push((coin.id, UpsertOutcome::Updated));
    }

    debug!(
        inserted = report.inserted(),
        updated = report.updated(),
        "Holdings upserted"
    );
    Ok(report)
}
