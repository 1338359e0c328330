//! Inventory domain module.
//!
//! Business rules for roll, cut and raw-material stock, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod item;
pub mod reorder;
pub mod transaction;

pub use category::{CategorySchema, ItemCategory};
pub use item::{
    EditItem, ItemAttributes, ItemEdited, ItemPatch, MoveStock, StockCommand, StockEvent, StockItem,
    StockMoved, raw_material_id, total_quantity,
};
pub use reorder::{ReorderAlert, ReorderLevel, evaluate_alerts};
pub use transaction::{NOTE_INBOUND, NOTE_OUTBOUND, Transaction, UsageWindow, outbound_usage};
