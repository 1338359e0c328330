use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use rollstock_core::{AggregateRoot, ExpectedVersion, ItemId, WorkOrderId};
use rollstock_inventory::{ItemCategory, ReorderLevel, StockItem, Transaction, UsageWindow, outbound_usage};
use rollstock_workorders::WorkOrder;

use super::{InventoryStore, SettingsStore, StoreError, WorkOrderStore, item_key, with_version};

type ItemKey = (ItemCategory, ItemId);

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<ItemKey, StockItem>,
    transactions: Vec<Transaction>,
    thresholds: BTreeMap<ItemKey, ReorderLevel>,
    orders: BTreeMap<WorkOrderId, WorkOrder>,
    settings: HashMap<String, String>,
}

/// In-memory backend for tests/dev. Not optimized for performance.
///
/// [`InMemoryStore::set_available`] simulates an unreachable backend: while
/// unavailable every call fails with [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            state: RwLock::new(State::default()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.ensure_available()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.ensure_available()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn load(&self, category: ItemCategory) -> Result<Vec<StockItem>, StoreError> {
        let state = self.read()?;
        Ok(state
            .items
            .iter()
            .filter(|((c, _), _)| *c == category)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn get(&self, category: ItemCategory, id: &ItemId) -> Result<Option<StockItem>, StoreError> {
        let state = self.read()?;
        Ok(state.items.get(&(category, id.clone())).cloned())
    }

    async fn insert(&self, item: StockItem) -> Result<StockItem, StoreError> {
        let mut state = self.write()?;
        let key = (item.category(), item.id_typed().clone());
        if state.items.contains_key(&key) {
            return Err(StoreError::DuplicateKey(item_key(key.0, &key.1)));
        }
        let stored = with_version(&item, 0);
        state.items.insert(key, stored.clone());
        Ok(stored)
    }

    async fn save(&self, category: ItemCategory, items: Vec<StockItem>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for item in items {
            let key = (category, item.id_typed().clone());
            let version = state.items.get(&key).map(|old| old.version() + 1).unwrap_or(0);
            state.items.insert(key, with_version(&item, version));
        }
        Ok(())
    }

    async fn update(&self, item: StockItem, expected: ExpectedVersion) -> Result<StockItem, StoreError> {
        let mut state = self.write()?;
        let key = (item.category(), item.id_typed().clone());
        let current = state
            .items
            .get(&key)
            .map(|old| old.version())
            .ok_or_else(|| StoreError::NotFound(item_key(key.0, &key.1)))?;

        expected
            .check(current)
            .map_err(|e| StoreError::Conflict(format!("{}: {e}", item_key(key.0, &key.1))))?;

        let stored = with_version(&item, current + 1);
        state.items.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, category: ItemCategory, id: &ItemId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .items
            .remove(&(category, id.clone()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(item_key(category, id)))
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        self.write()?.transactions.push(transaction);
        Ok(())
    }

    async fn transactions(&self, category: ItemCategory, id: &ItemId) -> Result<Vec<Transaction>, StoreError> {
        let state = self.read()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.category == category && t.item_id == *id)
            .cloned()
            .collect())
    }

    async fn query_usage(&self, category: ItemCategory, id: &ItemId, window: UsageWindow) -> Result<f64, StoreError> {
        let state = self.read()?;
        Ok(outbound_usage(
            state
                .transactions
                .iter()
                .filter(|t| t.category == category && t.item_id == *id),
            window,
        ))
    }

    async fn upsert_threshold(&self, level: ReorderLevel) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .thresholds
            .insert((level.category, level.item_id.clone()), level);
        Ok(())
    }

    async fn get_threshold(&self, category: ItemCategory, id: &ItemId) -> Result<Option<f64>, StoreError> {
        let state = self.read()?;
        Ok(state
            .thresholds
            .get(&(category, id.clone()))
            .map(|level| level.threshold))
    }

    async fn thresholds(&self, category: ItemCategory) -> Result<Vec<ReorderLevel>, StoreError> {
        let state = self.read()?;
        Ok(state
            .thresholds
            .values()
            .filter(|level| level.category == category)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkOrderStore for InMemoryStore {
    async fn list_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        let state = self.read()?;
        let mut orders: Vec<WorkOrder> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id_typed().cmp(b.id_typed()))
        });
        Ok(orders)
    }

    async fn get_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        Ok(self.read()?.orders.get(id).cloned())
    }

    async fn insert_order(&self, order: WorkOrder) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.orders.contains_key(order.id_typed()) {
            return Err(StoreError::DuplicateKey(format!("work_order/{}", order.id_typed())));
        }
        state.orders.insert(order.id_typed().clone(), order);
        Ok(())
    }

    async fn update_order(&self, order: WorkOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let current = state
            .orders
            .get(order.id_typed())
            .map(|old| old.version())
            .ok_or_else(|| StoreError::NotFound(format!("work_order/{}", order.id_typed())))?;

        expected
            .check(current)
            .map_err(|e| StoreError::Conflict(format!("work_order/{}: {e}", order.id_typed())))?;

        state.orders.insert(order.id_typed().clone(), order);
        Ok(())
    }

    async fn delete_order(&self, id: &WorkOrderId) -> Result<(), StoreError> {
        self.write()?
            .orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("work_order/{id}")))
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write()?.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rollstock_inventory::ItemAttributes;

    fn roll(id: &str, quantity: f64) -> StockItem {
        StockItem::new(
            ItemId::new(id).unwrap(),
            ItemAttributes::Roll {
                thickness_mm: 0.5,
                width_cm: 100.0,
                length_m: 200.0,
            },
            quantity,
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let store = InMemoryStore::new();
        store.insert(roll("V-1", 5.0)).await.unwrap();
        let err = store.insert(roll("V-1", 9.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));

        let kept = store.get(ItemCategory::Roll, &ItemId::new("V-1").unwrap()).await.unwrap().unwrap();
        assert_eq!(kept.quantity(), 5.0);
    }

    #[tokio::test]
    async fn update_checks_version() {
        let store = InMemoryStore::new();
        let stored = store.insert(roll("V-1", 5.0)).await.unwrap();
        assert_eq!(stored.version(), 0);

        let updated = store
            .update(roll("V-1", 4.0), ExpectedVersion::Exact(0))
            .await
            .unwrap();
        assert_eq!(updated.version(), 1);

        let err = store
            .update(roll("V-1", 3.0), ExpectedVersion::Exact(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .update(roll("V-404", 3.0), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn categories_are_separate_keyspaces() {
        let store = InMemoryStore::new();
        store.insert(roll("A-1", 1.0)).await.unwrap();
        assert!(store.load(ItemCategory::Cut).await.unwrap().is_empty());
        assert_eq!(store.load(ItemCategory::Roll).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_switch_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.load(ItemCategory::Roll).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.get_setting("company_code").await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert!(store.load(ItemCategory::Roll).await.unwrap().is_empty());
    }
}
