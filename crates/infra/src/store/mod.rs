//! Storage boundary for stock records, the transaction log, reorder
//! thresholds, work orders and settings.
//!
//! Backends make no business decisions: validation and invariants live in
//! the domain crates and the [`crate::ledger`] / [`crate::tracker`] services.
//! Stores only enforce key uniqueness and version preconditions.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use rollstock_core::{ExpectedVersion, ItemId, WorkOrderId};
use rollstock_inventory::{ItemCategory, ReorderLevel, StockItem, Transaction, UsageWindow};
use rollstock_workorders::WorkOrder;

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Settings key under which the shared company code is kept.
pub const COMPANY_CODE_KEY: &str = "company_code";

/// Storage operation error.
///
/// These are infrastructure failures (missing keys, stale versions, an
/// unreachable backend) as opposed to domain errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Stock records, transaction log and reorder thresholds, keyed by category.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// All records in a category, ordered by id.
    async fn load(&self, category: ItemCategory) -> Result<Vec<StockItem>, StoreError>;

    async fn get(&self, category: ItemCategory, id: &ItemId) -> Result<Option<StockItem>, StoreError>;

    /// Insert a new record; `DuplicateKey` if the id already exists in its category.
    async fn insert(&self, item: StockItem) -> Result<StockItem, StoreError>;

    /// Per-key upsert of a batch. Existing records get their version bumped.
    async fn save(&self, category: ItemCategory, items: Vec<StockItem>) -> Result<(), StoreError>;

    /// Conditional overwrite of an existing record.
    ///
    /// `NotFound` if absent, `Conflict` if the stored version does not match
    /// `expected`. The returned record carries the new stored version.
    async fn update(&self, item: StockItem, expected: ExpectedVersion) -> Result<StockItem, StoreError>;

    async fn delete(&self, category: ItemCategory, id: &ItemId) -> Result<(), StoreError>;

    async fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    /// Log entries for one item, oldest first.
    async fn transactions(&self, category: ItemCategory, id: &ItemId) -> Result<Vec<Transaction>, StoreError>;

    /// Sum of `-delta` over outbound entries with `window.start <= at < window.end`.
    async fn query_usage(&self, category: ItemCategory, id: &ItemId, window: UsageWindow) -> Result<f64, StoreError>;

    async fn upsert_threshold(&self, level: ReorderLevel) -> Result<(), StoreError>;

    async fn get_threshold(&self, category: ItemCategory, id: &ItemId) -> Result<Option<f64>, StoreError>;

    async fn thresholds(&self, category: ItemCategory) -> Result<Vec<ReorderLevel>, StoreError>;
}

/// Work order records.
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    /// All work orders, ordered by creation time then id.
    async fn list_orders(&self) -> Result<Vec<WorkOrder>, StoreError>;

    async fn get_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, StoreError>;

    /// `DuplicateKey` if the id exists; the stored order is left untouched.
    async fn insert_order(&self, order: WorkOrder) -> Result<(), StoreError>;

    async fn update_order(&self, order: WorkOrder, expected: ExpectedVersion) -> Result<(), StoreError>;

    async fn delete_order(&self, id: &WorkOrderId) -> Result<(), StoreError>;
}

/// Small string key/value settings table.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Everything a running server needs from one backend.
pub trait Backend: InventoryStore + WorkOrderStore + SettingsStore {}

impl<S> Backend for S where S: InventoryStore + WorkOrderStore + SettingsStore + ?Sized {}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn load(&self, category: ItemCategory) -> Result<Vec<StockItem>, StoreError> {
        (**self).load(category).await
    }

    async fn get(&self, category: ItemCategory, id: &ItemId) -> Result<Option<StockItem>, StoreError> {
        (**self).get(category, id).await
    }

    async fn insert(&self, item: StockItem) -> Result<StockItem, StoreError> {
        (**self).insert(item).await
    }

    async fn save(&self, category: ItemCategory, items: Vec<StockItem>) -> Result<(), StoreError> {
        (**self).save(category, items).await
    }

    async fn update(&self, item: StockItem, expected: ExpectedVersion) -> Result<StockItem, StoreError> {
        (**self).update(item, expected).await
    }

    async fn delete(&self, category: ItemCategory, id: &ItemId) -> Result<(), StoreError> {
        (**self).delete(category, id).await
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        (**self).append_transaction(transaction).await
    }

    async fn transactions(&self, category: ItemCategory, id: &ItemId) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions(category, id).await
    }

    async fn query_usage(&self, category: ItemCategory, id: &ItemId, window: UsageWindow) -> Result<f64, StoreError> {
        (**self).query_usage(category, id, window).await
    }

    async fn upsert_threshold(&self, level: ReorderLevel) -> Result<(), StoreError> {
        (**self).upsert_threshold(level).await
    }

    async fn get_threshold(&self, category: ItemCategory, id: &ItemId) -> Result<Option<f64>, StoreError> {
        (**self).get_threshold(category, id).await
    }

    async fn thresholds(&self, category: ItemCategory) -> Result<Vec<ReorderLevel>, StoreError> {
        (**self).thresholds(category).await
    }
}

#[async_trait]
impl<S> WorkOrderStore for Arc<S>
where
    S: WorkOrderStore + ?Sized,
{
    async fn list_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        (**self).list_orders().await
    }

    async fn get_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        (**self).get_order(id).await
    }

    async fn insert_order(&self, order: WorkOrder) -> Result<(), StoreError> {
        (**self).insert_order(order).await
    }

    async fn update_order(&self, order: WorkOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).update_order(order, expected).await
    }

    async fn delete_order(&self, id: &WorkOrderId) -> Result<(), StoreError> {
        (**self).delete_order(id).await
    }
}

#[async_trait]
impl<S> SettingsStore for Arc<S>
where
    S: SettingsStore + ?Sized,
{
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_setting(key).await
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).put_setting(key, value).await
    }
}

/// Copy of `item` carrying a store-assigned version.
pub(crate) fn with_version(item: &StockItem, version: u64) -> StockItem {
    StockItem::restore(
        item.id_typed().clone(),
        item.attributes().clone(),
        item.quantity(),
        item.updated_at(),
        version,
    )
}

fn item_key(category: ItemCategory, id: &ItemId) -> String {
    format!("{category}/{id}")
}
