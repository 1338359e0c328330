//! Ledger operations: stock mutations paired with transaction log entries.
//!
//! Every stock write follows validate → conditional update → log append.
//! The update is conditional on the version that was read, so a concurrent
//! writer makes the movement fail with a conflict before anything is logged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use rollstock_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, ItemId};
use rollstock_inventory::{
    EditItem, ItemCategory, ItemPatch, MoveStock, ReorderAlert, ReorderLevel, StockCommand, StockEvent, StockItem,
    Transaction, UsageWindow, evaluate_alerts, total_quantity,
};

use crate::clock::{Clock, SystemClock};
use crate::store::{InventoryStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a successful movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub item: StockItem,
    pub transaction: Transaction,
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLine {
    pub item: StockItem,
    /// Outbound usage in the current calendar month.
    pub monthly_usage: f64,
    pub reorder_level: Option<f64>,
}

/// The dashboard read for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub category: ItemCategory,
    pub unit: &'static str,
    pub usage_window: UsageWindow,
    pub lines: Vec<StockLine>,
    pub alerts: Vec<ReorderAlert>,
    pub total_quantity: f64,
    /// Set when the backend could not be reached. `lines` is then empty
    /// because nothing could be read, not because the store is empty.
    pub degraded: Option<String>,
}

impl StockSnapshot {
    fn degraded(category: ItemCategory, usage_window: UsageWindow, reason: String) -> Self {
        Self {
            category,
            unit: category.schema().unit,
            usage_window,
            lines: Vec::new(),
            alerts: Vec::new(),
            total_quantity: 0.0,
            degraded: Some(reason),
        }
    }
}

/// Inventory ledger over any [`InventoryStore`]. One generic implementation
/// serves all three categories.
#[derive(Debug, Clone)]
pub struct Ledger<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> Ledger<S, SystemClock>
where
    S: InventoryStore,
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S, C> Ledger<S, C>
where
    S: InventoryStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn require(&self, category: ItemCategory, id: &ItemId) -> Result<StockItem, LedgerError> {
        self.store
            .get(category, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("{category} item {id}")).into())
    }

    #[instrument(skip(self, item), fields(category = %item.category(), item_id = %item.id_typed()), err)]
    pub async fn register_item(&self, item: StockItem) -> Result<StockItem, LedgerError> {
        item.validate()?;
        let mut item = item;
        item.touch(self.now());

        let stored = self.store.insert(item).await.map_err(write_error)?;
        info!(quantity = stored.quantity(), "stock item registered");
        Ok(stored)
    }

    pub async fn get_item(&self, category: ItemCategory, id: &ItemId) -> Result<StockItem, LedgerError> {
        self.require(category, id).await
    }

    /// Record an inbound (`delta > 0`) or outbound (`delta < 0`) movement.
    ///
    /// A movement that would take stock below zero fails with
    /// `InsufficientStock` and neither the stock nor the log is touched.
    #[instrument(skip(self, note), err)]
    pub async fn apply_movement(
        &self,
        category: ItemCategory,
        id: &ItemId,
        delta: f64,
        note: &str,
    ) -> Result<Movement, LedgerError> {
        let mut item = self.require(category, id).await?;
        let read_version = item.version();

        let command = StockCommand::MoveStock(MoveStock {
            delta,
            note: note.to_string(),
            occurred_at: self.now(),
        });
        let events = item.execute(&command).map_err(|e| {
            warn!(error = %e, "movement rejected");
            e
        })?;

        let stored = self
            .store
            .update(item, ExpectedVersion::Exact(read_version))
            .await
            .map_err(write_error)?;

        let transaction = events
            .iter()
            .find_map(|event| match event {
                StockEvent::StockMoved(moved) => Some(moved.to_transaction()),
                StockEvent::ItemEdited(_) => None,
            })
            .ok_or_else(|| DomainError::validation("movement produced no transaction"))?;
        self.store.append_transaction(transaction.clone()).await?;

        info!(new_quantity = stored.quantity(), "stock movement recorded");
        Ok(Movement {
            item: stored,
            transaction,
        })
    }

    /// Outbound usage of one item in calendar month `year-month` (UTC).
    pub async fn monthly_usage(
        &self,
        category: ItemCategory,
        id: &ItemId,
        year: i32,
        month: u32,
    ) -> Result<f64, LedgerError> {
        let window = UsageWindow::month(year, month)?;
        Ok(self.store.query_usage(category, id, window).await?)
    }

    /// Outbound usage of one item in the month containing "now".
    pub async fn current_month_usage(&self, category: ItemCategory, id: &ItemId) -> Result<f64, LedgerError> {
        let window = UsageWindow::containing(self.now());
        Ok(self.store.query_usage(category, id, window).await?)
    }

    pub async fn transactions(&self, category: ItemCategory, id: &ItemId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.transactions(category, id).await?)
    }

    /// Replace a batch of records in one category (per-key upsert).
    ///
    /// Every record is checked before anything is written; the first bad
    /// record aborts the whole batch and the store is left unchanged.
    #[instrument(skip(self, items), fields(count = items.len()), err)]
    pub async fn bulk_replace(&self, category: ItemCategory, items: Vec<StockItem>) -> Result<usize, LedgerError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.category() != category {
                return Err(DomainError::validation(format!(
                    "item {} is a {} item, not {category}",
                    item.id_typed(),
                    item.category()
                ))
                .into());
            }
            if !seen.insert(item.id_typed().clone()) {
                return Err(DomainError::validation(format!("item {} appears twice in batch", item.id_typed())).into());
            }
            item.validate().map_err(|e| {
                warn!(item_id = %item.id_typed(), error = %e, "bulk replace rejected");
                e
            })?;
        }

        let now = self.now();
        let count = items.len();
        let items = items
            .into_iter()
            .map(|mut item| {
                item.touch(now);
                item
            })
            .collect();
        self.store.save(category, items).await?;

        info!(count, "stock records replaced");
        Ok(count)
    }

    /// Edit attributes and/or overwrite the quantity of an existing item.
    #[instrument(skip(self, patch), err)]
    pub async fn update_item(
        &self,
        category: ItemCategory,
        id: &ItemId,
        patch: ItemPatch,
    ) -> Result<StockItem, LedgerError> {
        let mut item = self.require(category, id).await?;
        let read_version = item.version();

        item.execute(&StockCommand::EditItem(EditItem {
            patch,
            occurred_at: self.now(),
        }))?;

        let stored = self
            .store
            .update(item, ExpectedVersion::Exact(read_version))
            .await
            .map_err(write_error)?;
        info!("stock item updated");
        Ok(stored)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_item(&self, category: ItemCategory, id: &ItemId) -> Result<(), LedgerError> {
        match self.store.delete(category, id).await {
            Ok(()) => {
                info!("stock item deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(DomainError::not_found(format!("{category} item {id}")).into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_reorder_level(
        &self,
        category: ItemCategory,
        id: &ItemId,
        threshold: f64,
    ) -> Result<ReorderLevel, LedgerError> {
        let level = ReorderLevel::new(category, id.clone(), threshold)?;
        self.store.upsert_threshold(level.clone()).await?;
        info!(%category, item_id = %id, threshold, "reorder level set");
        Ok(level)
    }

    /// `None` when no threshold was ever set (distinct from a zero threshold).
    pub async fn get_reorder_level(&self, category: ItemCategory, id: &ItemId) -> Result<Option<f64>, LedgerError> {
        Ok(self.store.get_threshold(category, id).await?)
    }

    pub async fn reorder_alerts(&self, category: ItemCategory) -> Result<Vec<ReorderAlert>, LedgerError> {
        let items = self.store.load(category).await?;
        let thresholds = self.threshold_map(category).await?;
        Ok(evaluate_alerts(&items, |id| thresholds.get(id).copied()))
    }

    pub async fn total_quantity(&self, category: ItemCategory) -> Result<f64, LedgerError> {
        let items = self.store.load(category).await?;
        Ok(total_quantity(&items))
    }

    /// Items, current-month usage and alerts for one category.
    ///
    /// An unreachable backend yields an empty snapshot with `degraded` set;
    /// every other failure is returned.
    #[instrument(skip(self))]
    pub async fn stock_snapshot(&self, category: ItemCategory) -> Result<StockSnapshot, LedgerError> {
        let window = UsageWindow::containing(self.now());
        match self.build_snapshot(category, window).await {
            Err(LedgerError::Store(StoreError::Unavailable(reason))) => {
                warn!(%reason, "backend unavailable; serving degraded snapshot");
                Ok(StockSnapshot::degraded(category, window, reason))
            }
            other => other,
        }
    }

    async fn build_snapshot(&self, category: ItemCategory, window: UsageWindow) -> Result<StockSnapshot, LedgerError> {
        let items = self.store.load(category).await?;
        let thresholds = self.threshold_map(category).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let monthly_usage = self.store.query_usage(category, item.id_typed(), window).await?;
            lines.push(StockLine {
                item: item.clone(),
                monthly_usage,
                reorder_level: thresholds.get(item.id_typed()).copied(),
            });
        }

        Ok(StockSnapshot {
            category,
            unit: category.schema().unit,
            usage_window: window,
            alerts: evaluate_alerts(&items, |id| thresholds.get(id).copied()),
            total_quantity: total_quantity(&items),
            lines,
            degraded: None,
        })
    }

    async fn threshold_map(&self, category: ItemCategory) -> Result<HashMap<ItemId, f64>, LedgerError> {
        Ok(self
            .store
            .thresholds(category)
            .await?
            .into_iter()
            .map(|level| (level.item_id, level.threshold))
            .collect())
    }
}

/// Uniqueness and version failures on a write are domain outcomes; the
/// rest stay store errors.
fn write_error(err: StoreError) -> LedgerError {
    match err {
        StoreError::DuplicateKey(key) => DomainError::duplicate(key).into(),
        StoreError::Conflict(msg) => DomainError::conflict(msg).into(),
        other => other.into(),
    }
}
