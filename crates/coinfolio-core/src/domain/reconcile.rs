//! Upsert/merge reconciliation of remote batches against local rows
//!
//! The store adapter runs these functions inside one transaction. They decide
//! *what* to write; the adapter decides *how*.
//!
//! ## Two-phase upsert
//!
//! 1. Insert every incoming coin with "ignore on conflict" semantics. Rows the
//!    store rejects (primary key already present) form the update set.
//! 2. Each update-set row is read back, its remote-origin fields replaced by
//!    [`merge_remote`], and written individually. `owned_amount` is never part
//!    of the write, which is why a blanket replace-on-conflict cannot be used.
//!
//! ## Catalog refresh of holdings
//!
//! [`apply_catalog`] updates only holdings that already exist. Holdings whose
//! coin is missing from the catalog (delisted) keep their stale snapshot;
//! deleting them is an explicit user action.

use std::collections::{HashMap, HashSet};

use super::coin::Coin;
use super::errors::DomainError;
use super::holding::Holding;
use super::newtypes::CoinId;

/// Split of an incoming batch into rows to insert and rows to update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub to_insert: Vec<Coin>,
    pub to_update: Vec<Coin>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty()
    }
}

/// Splits `incoming` into insert and update sets given the keys already stored
///
/// Mirrors insert-ignore semantics: a duplicate id inside `incoming` conflicts
/// with its own earlier occurrence, so only the first occurrence of a new id
/// is inserted and later ones are updates.
pub fn reconcile(incoming: &[Coin], existing_keys: &HashSet<CoinId>) -> Reconciliation {
    let mut seen: HashSet<CoinId> = HashSet::with_capacity(incoming.len());
    let mut plan = Reconciliation::default();

    for coin in incoming {
        let is_new = !existing_keys.contains(&coin.id) && seen.insert(coin.id);
        if is_new {
            plan.to_insert.push(coin.clone());
        } else {
            plan.to_update.push(coin.clone());
        }
    }

    plan
}

/// Overwrites every remote-origin field of `existing` with `incoming`
///
/// The owned amount is preserved and the derived values recomputed from the
/// new price and 24h change.
///
/// # Errors
/// Returns `DomainError::IdMismatch` if the ids differ.
pub fn merge_remote(existing: &Holding, incoming: &Coin) -> Result<Holding, DomainError> {
    let mut merged = existing.clone();
    merged.replace_coin(incoming.clone())?;
    Ok(merged)
}

/// Result of refreshing the holdings table from a full catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogMerge {
    /// Holdings whose embedded coin was replaced
    pub updated: Vec<Holding>,
    /// Holdings absent from the catalog, left untouched
    pub delisted: Vec<CoinId>,
}

/// Refreshes existing holdings from a catalog batch
///
/// When the catalog contains the same id more than once, the last entry wins.
///
/// # Errors
/// Returns `DomainError::Overflow` if a new price cannot value an owned
/// amount; the whole batch is then rejected.
pub fn apply_catalog(holdings: &[Holding], catalog: &[Coin]) -> Result<CatalogMerge, DomainError> {
    let by_id: HashMap<CoinId, &Coin> = catalog.iter().map(|c| (c.id, c)).collect();
    let mut result = CatalogMerge::default();

    for holding in holdings {
        match by_id.get(&holding.id()) {
            Some(coin) => result.updated.push(merge_remote(holding, coin)?),
            None => result.delisted.push(holding.id()),
        }
    }

    Ok(result)
}
