//! SQLite-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | `PoolClosed`, `PoolTimedOut`, `Io`, `Tls` | `Unavailable` |
//! | `ColumnDecode`, `Decode`, `ColumnNotFound` | `Corrupt` |
//! | `RowNotFound` | `NotFound` |
//! | Database (unique constraint) | `DuplicateKey` |
//! | anything else | `Unavailable` |
//!
//! Timestamps are stored as fixed-width UTC text (`%Y-%m-%dT%H:%M:%S%.6fZ`)
//! so lexical order in SQL matches time order.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use rollstock_core::{AggregateRoot, ExpectedVersion, ItemId, WorkOrderId};
use rollstock_inventory::{ItemAttributes, ItemCategory, ReorderLevel, StockItem, Transaction, UsageWindow};
use rollstock_workorders::WorkOrder;

use super::{InventoryStore, SettingsStore, StoreError, WorkOrderStore, item_key, with_version};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_items (
        category    TEXT    NOT NULL,
        id          TEXT    NOT NULL,
        quantity    REAL    NOT NULL CHECK (quantity >= 0),
        updated_at  TEXT    NOT NULL,
        version     INTEGER NOT NULL DEFAULT 0,
        attributes  TEXT    NOT NULL,
        PRIMARY KEY (category, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        seq          INTEGER PRIMARY KEY AUTOINCREMENT,
        category     TEXT    NOT NULL,
        item_id      TEXT    NOT NULL,
        delta        REAL    NOT NULL,
        note         TEXT    NOT NULL,
        occurred_at  TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS transactions_item_time
        ON transactions (category, item_id, occurred_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reorder_levels (
        category   TEXT NOT NULL,
        item_id    TEXT NOT NULL,
        threshold  REAL NOT NULL,
        PRIMARY KEY (category, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_orders (
        id          TEXT    PRIMARY KEY,
        created_at  TEXT    NOT NULL,
        version     INTEGER NOT NULL,
        data        TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key    TEXT PRIMARY KEY,
        value  TEXT NOT NULL
    )
    "#,
];

/// SQLite-backed store. Cheap to clone; shares one connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and ensure the schema exists.
    ///
    /// `sqlite::memory:` URLs get a single long-lived connection, since every
    /// new in-memory connection would otherwise see an empty database.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true);

        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    /// Close the pool; later calls fail with [`StoreError::Unavailable`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn stored_item_version(&self, category: ItemCategory, id: &ItemId) -> Result<Option<u64>, StoreError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM stock_items WHERE category = ?1 AND id = ?2")
            .bind(category.as_str())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("stored_item_version", e))?;
        version.map(decode_version).transpose()
    }

    async fn stored_order_version(&self, id: &WorkOrderId) -> Result<Option<u64>, StoreError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM work_orders WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("stored_order_version", e))?;
        version.map(decode_version).transpose()
    }
}

#[async_trait]
impl InventoryStore for SqliteStore {
    #[instrument(skip(self), err)]
    async fn load(&self, category: ItemCategory) -> Result<Vec<StockItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, quantity, updated_at, version, attributes
            FROM stock_items
            WHERE category = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load", e))?;

        rows.iter().map(|row| item_from_row(category, row)).collect()
    }

    async fn get(&self, category: ItemCategory, id: &ItemId) -> Result<Option<StockItem>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, quantity, updated_at, version, attributes
            FROM stock_items
            WHERE category = ?1 AND id = ?2
            "#,
        )
        .bind(category.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|row| item_from_row(category, &row)).transpose()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id_typed()), err)]
    async fn insert(&self, item: StockItem) -> Result<StockItem, StoreError> {
        let category = item.category();
        let result = sqlx::query(
            r#"
            INSERT INTO stock_items (category, id, quantity, updated_at, version, attributes)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ON CONFLICT (category, id) DO NOTHING
            "#,
        )
        .bind(category.as_str())
        .bind(item.id_typed().as_str())
        .bind(item.quantity())
        .bind(encode_timestamp(item.updated_at()))
        .bind(encode_attributes(item.attributes())?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateKey(item_key(category, item.id_typed())));
        }
        Ok(with_version(&item, 0))
    }

    #[instrument(skip(self, items), fields(count = items.len()), err)]
    async fn save(&self, category: ItemCategory, items: Vec<StockItem>) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO stock_items (category, id, quantity, updated_at, version, attributes)
                VALUES (?1, ?2, ?3, ?4, 0, ?5)
                ON CONFLICT (category, id) DO UPDATE SET
                    quantity   = excluded.quantity,
                    updated_at = excluded.updated_at,
                    attributes = excluded.attributes,
                    version    = stock_items.version + 1
                "#,
            )
            .bind(category.as_str())
            .bind(item.id_typed().as_str())
            .bind(item.quantity())
            .bind(encode_timestamp(item.updated_at()))
            .bind(encode_attributes(item.attributes())?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("save", e))
    }

    #[instrument(skip(self, item), fields(item_id = %item.id_typed()), err)]
    async fn update(&self, item: StockItem, expected: ExpectedVersion) -> Result<StockItem, StoreError> {
        let category = item.category();
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(encode_version(v)?),
        };

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock_items
            SET quantity = ?3, updated_at = ?4, attributes = ?5, version = version + 1
            WHERE category = ?1 AND id = ?2 AND (?6 IS NULL OR version = ?6)
            RETURNING version
            "#,
        )
        .bind(category.as_str())
        .bind(item.id_typed().as_str())
        .bind(item.quantity())
        .bind(encode_timestamp(item.updated_at()))
        .bind(encode_attributes(item.attributes())?)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        match new_version {
            Some(v) => Ok(with_version(&item, decode_version(v)?)),
            None => match self.stored_item_version(category, item.id_typed()).await? {
                None => Err(StoreError::NotFound(item_key(category, item.id_typed()))),
                Some(found) => Err(version_conflict(item_key(category, item.id_typed()), expected, found)),
            },
        }
    }

    async fn delete(&self, category: ItemCategory, id: &ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM stock_items WHERE category = ?1 AND id = ?2")
            .bind(category.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(item_key(category, id)));
        }
        Ok(())
    }

    #[instrument(skip(self, transaction), fields(item_id = %transaction.item_id, delta = transaction.delta), err)]
    async fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (category, item_id, delta, note, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(transaction.category.as_str())
        .bind(transaction.item_id.as_str())
        .bind(transaction.delta)
        .bind(&transaction.note)
        .bind(encode_timestamp(transaction.occurred_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_transaction", e))?;
        Ok(())
    }

    async fn transactions(&self, category: ItemCategory, id: &ItemId) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT delta, note, occurred_at
            FROM transactions
            WHERE category = ?1 AND item_id = ?2
            ORDER BY seq ASC
            "#,
        )
        .bind(category.as_str())
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions", e))?;

        rows.iter()
            .map(|row| -> Result<Transaction, StoreError> {
                Ok(Transaction {
                    category,
                    item_id: id.clone(),
                    delta: column(row, "delta")?,
                    note: column(row, "note")?,
                    occurred_at: decode_timestamp(&column::<String>(row, "occurred_at")?)?,
                })
            })
            .collect()
    }

    async fn query_usage(&self, category: ItemCategory, id: &ItemId, window: UsageWindow) -> Result<f64, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(-delta), 0.0)
            FROM transactions
            WHERE category = ?1 AND item_id = ?2 AND delta < 0
              AND occurred_at >= ?3 AND occurred_at < ?4
            "#,
        )
        .bind(category.as_str())
        .bind(id.as_str())
        .bind(encode_timestamp(window.start))
        .bind(encode_timestamp(window.end))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_usage", e))
    }

    async fn upsert_threshold(&self, level: ReorderLevel) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reorder_levels (category, item_id, threshold)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (category, item_id) DO UPDATE SET threshold = excluded.threshold
            "#,
        )
        .bind(level.category.as_str())
        .bind(level.item_id.as_str())
        .bind(level.threshold)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_threshold", e))?;
        Ok(())
    }

    async fn get_threshold(&self, category: ItemCategory, id: &ItemId) -> Result<Option<f64>, StoreError> {
        sqlx::query_scalar("SELECT threshold FROM reorder_levels WHERE category = ?1 AND item_id = ?2")
            .bind(category.as_str())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_threshold", e))
    }

    async fn thresholds(&self, category: ItemCategory) -> Result<Vec<ReorderLevel>, StoreError> {
        let rows = sqlx::query("SELECT item_id, threshold FROM reorder_levels WHERE category = ?1 ORDER BY item_id")
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("thresholds", e))?;

        rows.iter()
            .map(|row| -> Result<ReorderLevel, StoreError> {
                Ok(ReorderLevel {
                    category,
                    item_id: decode_id(&column::<String>(row, "item_id")?)?,
                    threshold: column(row, "threshold")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl WorkOrderStore for SqliteStore {
    async fn list_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        let rows = sqlx::query("SELECT data FROM work_orders ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        rows.iter().map(order_from_row).collect()
    }

    async fn get_order(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        let row = sqlx::query("SELECT data FROM work_orders WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn insert_order(&self, order: WorkOrder) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO work_orders (id, created_at, version, data)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(order.id_typed().as_str())
        .bind(encode_timestamp(order.created_at()))
        .bind(encode_version(order.version())?)
        .bind(encode_order(&order)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateKey(format!("work_order/{}", order.id_typed())));
        }
        Ok(())
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn update_order(&self, order: WorkOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(encode_version(v)?),
        };

        let result = sqlx::query(
            r#"
            UPDATE work_orders
            SET version = ?2, data = ?3
            WHERE id = ?1 AND (?4 IS NULL OR version = ?4)
            "#,
        )
        .bind(order.id_typed().as_str())
        .bind(encode_version(order.version())?)
        .bind(encode_order(&order)?)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        match self.stored_order_version(order.id_typed()).await? {
            None => Err(StoreError::NotFound(format!("work_order/{}", order.id_typed()))),
            Some(found) => Err(version_conflict(format!("work_order/{}", order.id_typed()), expected, found)),
        }
    }

    async fn delete_order(&self, id: &WorkOrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM work_orders WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("work_order/{id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_setting", e))
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_setting", e))?;
        Ok(())
    }
}

fn item_from_row(category: ItemCategory, row: &SqliteRow) -> Result<StockItem, StoreError> {
    let id = decode_id(&column::<String>(row, "id")?)?;
    let attributes: ItemAttributes = serde_json::from_str(&column::<String>(row, "attributes")?)
        .map_err(|e| StoreError::Corrupt(format!("attributes of {}: {e}", item_key(category, &id))))?;
    if attributes.category() != category {
        return Err(StoreError::Corrupt(format!(
            "{} carries {} attributes",
            item_key(category, &id),
            attributes.category()
        )));
    }

    Ok(StockItem::restore(
        id,
        attributes,
        column(row, "quantity")?,
        decode_timestamp(&column::<String>(row, "updated_at")?)?,
        decode_version(column(row, "version")?)?,
    ))
}

fn order_from_row(row: &SqliteRow) -> Result<WorkOrder, StoreError> {
    serde_json::from_str(&column::<String>(row, "data")?)
        .map_err(|e| StoreError::Corrupt(format!("work order data: {e}")))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn encode_attributes(attributes: &ItemAttributes) -> Result<String, StoreError> {
    serde_json::to_string(attributes).map_err(|e| StoreError::Corrupt(format!("attributes serialization failed: {e}")))
}

fn encode_order(order: &WorkOrder) -> Result<String, StoreError> {
    serde_json::to_string(order).map_err(|e| StoreError::Corrupt(format!("work order serialization failed: {e}")))
}

fn decode_id(raw: &str) -> Result<ItemId, StoreError> {
    ItemId::new(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn encode_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} out of range")))
}

fn decode_version(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Corrupt(format!("negative version {version}")))
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

/// Conflict for a conditional write that matched no row while the record exists.
fn version_conflict(key: String, expected: ExpectedVersion, found: u64) -> StoreError {
    match expected.check(found) {
        Err(e) => StoreError::Conflict(format!("{key}: {e}")),
        // Version matched yet the write missed: the row changed between the two statements.
        Ok(()) => StoreError::Conflict(format!("{key}: concurrent write at version {found}")),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.is_unique_violation() {
                StoreError::DuplicateKey(msg)
            } else {
                StoreError::Unavailable(msg)
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("unexpected row not found in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("decode error in {operation}: {err}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}
