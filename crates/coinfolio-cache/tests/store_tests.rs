//! Integration tests for SqliteMarketStore
//!
//! Every test opens a fresh in-memory database so tests never share rows.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::StreamExt;
use rust_decimal::Decimal;

use coinfolio_cache::{DatabasePool, SqliteMarketStore};
use coinfolio_core::domain::{Coin, CoinId, FiatCode, Holding};
use coinfolio_core::ports::{IMarketStore, UpsertOutcome};

// ============================================================================
// Test helpers
// ============================================================================

async fn setup() -> SqliteMarketStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteMarketStore::new(pool.pool().clone())
}

fn epoch(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
}

fn coin(id: u32, price: i64, minute: u32) -> Coin {
    Coin {
        id: CoinId::new(id),
        name: format!("Coin {id}"),
        symbol: format!("C{id}"),
        rank: id,
        fiat_code: FiatCode::usd(),
        price: Decimal::from(price),
        percent_change_1h: Decimal::ZERO,
        percent_change_24h: Decimal::from(10),
        percent_change_7d: Decimal::ZERO,
        fetched_at: epoch(minute),
    }
}

async fn next_value<T>(live: &mut coinfolio_core::ports::LiveQuery<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), live.next())
        .await
        .expect("live query did not emit")
        .expect("live query ended")
        .expect("live query failed")
}

// ============================================================================
// Catalog tests
// ============================================================================

#[tokio::test]
async fn test_save_catalog_orders_by_rank() {
    let store = setup().await;
    let report = store
        .save_catalog(&[coin(3, 1, 0), coin(1, 1, 0), coin(2, 1, 0)])
        .await
        .unwrap();
    assert_eq!(report.catalog_rows, 3);

    let mut live = store.observe_catalog();
    let catalog = next_value(&mut live).await;
    let ids: Vec<u32> = catalog.iter().map(|c| c.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_save_catalog_replaces_previous_listing() {
    let store = setup().await;
    store.save_catalog(&[coin(1, 1, 0), coin(2, 1, 0)]).await.unwrap();
    store.save_catalog(&[coin(2, 5, 1)]).await.unwrap();

    assert!(store.get_coin(CoinId::new(1)).await.unwrap().is_none());
    let two = store.get_coin(CoinId::new(2)).await.unwrap().unwrap();
    assert_eq!(two.price, Decimal::from(5));
    assert_eq!(two.fetched_at, epoch(1));
}

#[tokio::test]
async fn test_empty_catalog_batch_keeps_rows() {
    let store = setup().await;
    store.save_catalog(&[coin(1, 1, 0)]).await.unwrap();

    let report = store.save_catalog(&[]).await.unwrap();
    assert_eq!(report.catalog_rows, 1);
    assert!(store.get_coin(CoinId::new(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_catalog_refresh_updates_holdings_and_leaves_delisted_stale() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0), coin(2, 50, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(2)))
        .await
        .unwrap();

    let report = store.save_catalog(&[coin(1, 150, 5)]).await.unwrap();
    assert_eq!(report.holdings_refreshed, 1);
    assert_eq!(report.delisted, vec![CoinId::new(2)]);

    let one = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(one.coin().price, Decimal::from(150));
    assert_eq!(one.owned_amount(), Some(Decimal::from(2)));
    assert_eq!(one.value_in_fiat(), Some(Decimal::from(300)));

    let two = store.get_holding(CoinId::new(2)).await.unwrap().unwrap();
    assert_eq!(two.coin().fetched_at, epoch(0));
}

// ============================================================================
// Holdings upsert tests
// ============================================================================

#[tokio::test]
async fn test_upsert_inserts_new_rows_without_amount() {
    let store = setup().await;
    let report = store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();
    assert_eq!(report.outcomes, vec![(CoinId::new(1), UpsertOutcome::Inserted)]);

    let holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(holding.owned_amount(), None);
    assert_eq!(holding.value_in_fiat(), None);
}

#[tokio::test]
async fn test_upsert_preserves_owned_amount() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(2)))
        .await
        .unwrap();

    let report = store.upsert_holdings(&[coin(1, 150, 1)]).await.unwrap();
    assert_eq!(report.updated(), 1);
    assert_eq!(report.inserted(), 0);

    let holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(holding.owned_amount(), Some(Decimal::from(2)));
    assert_eq!(holding.coin().price, Decimal::from(150));
    assert_eq!(holding.value_in_fiat(), Some(Decimal::from(300)));
    assert_eq!(holding.value_change_24h_in_fiat(), Some(Decimal::from(30)));
    assert_eq!(holding.coin().fetched_at, epoch(1));
}

#[tokio::test]
async fn test_upsert_mixed_batch() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();

    let report = store
        .upsert_holdings(&[coin(1, 110, 1), coin(2, 20, 1)])
        .await
        .unwrap();
    assert_eq!(report.inserted(), 1);
    assert_eq!(report.updated(), 1);
    assert_eq!(
        store.holding_ids().await.unwrap(),
        vec![CoinId::new(1), CoinId::new(2)]
    );
}

#[tokio::test]
async fn test_upsert_duplicate_ids_in_batch_last_wins() {
    let store = setup().await;
    let report = store
        .upsert_holdings(&[coin(7, 10, 0), coin(7, 12, 0)])
        .await
        .unwrap();
    assert_eq!(report.inserted(), 1);
    assert_eq!(report.updated(), 1);

    let holding = store.get_holding(CoinId::new(7)).await.unwrap().unwrap();
    assert_eq!(holding.coin().price, Decimal::from(12));
}

#[tokio::test]
async fn test_empty_upsert_is_noop() {
    let store = setup().await;
    let report = store.upsert_holdings(&[]).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert!(store.holding_ids().await.unwrap().is_empty());
}

// ============================================================================
// User edit tests
// ============================================================================

#[tokio::test]
async fn test_set_owned_amount_missing_holding() {
    let store = setup().await;
    let result = store
        .set_owned_amount(CoinId::new(42), Some(Decimal::ONE))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_negative_amount_rejected_and_rolled_back() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(3)))
        .await
        .unwrap();

    let result = store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(-1)))
        .await;
    assert!(result.is_err());

    let holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(holding.owned_amount(), Some(Decimal::from(3)));
}

#[tokio::test]
async fn test_overflowing_amount_rejected_and_rolled_back() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 60000, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(3)))
        .await
        .unwrap();

    let huge = Decimal::from_i128_with_scale(10_i128.pow(25), 0);
    let result = store.set_owned_amount(CoinId::new(1), Some(huge)).await;
    assert!(result.is_err());

    let holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(holding.owned_amount(), Some(Decimal::from(3)));
    assert_eq!(holding.value_in_fiat(), Some(Decimal::from(180000)));
}

#[tokio::test]
async fn test_overflowing_catalog_refresh_rolls_back() {
    let store = setup().await;
    store.save_catalog(&[coin(1, 1, 0)]).await.unwrap();
    store.upsert_holdings(&[coin(1, 1, 0)]).await.unwrap();
    let huge = Decimal::from_i128_with_scale(10_i128.pow(25), 0);
    store
        .set_owned_amount(CoinId::new(1), Some(huge))
        .await
        .unwrap();

    let result = store.save_catalog(&[coin(1, 60000, 5), coin(2, 3, 5)]).await;
    assert!(result.is_err());

    let catalog = store.get_coin(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(catalog.price, Decimal::ONE);
    assert!(store.get_coin(CoinId::new(2)).await.unwrap().is_none());
    let holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(holding.value_in_fiat(), Some(huge));
}

#[tokio::test]
async fn test_clear_owned_amount() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(3)))
        .await
        .unwrap();

    let holding = store
        .set_owned_amount(CoinId::new(1), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.owned_amount(), None);
    assert_eq!(holding.value_in_fiat(), None);
}

#[tokio::test]
async fn test_delete_and_restore_holdings() {
    let store = setup().await;
    store.upsert_holdings(&[coin(1, 100, 0), coin(2, 5, 0)]).await.unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::new(25, 1)))
        .await
        .unwrap();
    let before: Holding = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();

    let removed = store
        .delete_holdings(&[CoinId::new(1), CoinId::new(99)])
        .await
        .unwrap();
    assert_eq!(removed, vec![before.clone()]);
    assert_eq!(store.holding_ids().await.unwrap(), vec![CoinId::new(2)]);

    store.restore_holdings(&removed).await.unwrap();
    let after = store.get_holding(CoinId::new(1)).await.unwrap().unwrap();
    assert_eq!(after, before);
}

// ============================================================================
// Live query tests
// ============================================================================

#[tokio::test]
async fn test_holdings_live_query_reemits_after_commit() {
    let store = setup().await;
    let mut live = store.observe_holdings();
    assert!(next_value(&mut live).await.is_empty());

    store.upsert_holdings(&[coin(1, 100, 0)]).await.unwrap();
    let holdings = next_value(&mut live).await;
    assert_eq!(holdings.len(), 1);

    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(2)))
        .await
        .unwrap();
    let holdings = next_value(&mut live).await;
    assert_eq!(holdings[0].value_in_fiat(), Some(Decimal::from(200)));
}

#[tokio::test]
async fn test_holdings_ordered_by_value_then_rank() {
    let store = setup().await;
    store
        .upsert_holdings(&[coin(1, 100, 0), coin(2, 10, 0), coin(3, 1, 0)])
        .await
        .unwrap();
    store
        .set_owned_amount(CoinId::new(2), Some(Decimal::from(50)))
        .await
        .unwrap();
    store
        .set_owned_amount(CoinId::new(1), Some(Decimal::from(1)))
        .await
        .unwrap();

    let mut live = store.observe_holdings();
    let ids: Vec<u32> = next_value(&mut live)
        .await
        .iter()
        .map(|h| h.id().get())
        .collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[tokio::test]
async fn test_catalog_live_query_sees_whole_batch() {
    let store = setup().await;
    let mut live = store.observe_catalog();
    assert!(next_value(&mut live).await.is_empty());

    store
        .save_catalog(&[coin(1, 1, 0), coin(2, 1, 0), coin(3, 1, 0)])
        .await
        .unwrap();
    assert_eq!(next_value(&mut live).await.len(), 3);
}
