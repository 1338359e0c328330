//! Infrastructure layer: storage backends, ledger and tracker services,
//! operator access, clock and configuration.

pub mod access;
pub mod clock;
pub mod config;
pub mod ledger;
pub mod store;
pub mod tracker;

pub use access::{AccessControl, AccessError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, BackendKind, ConfigError};
pub use ledger::{Ledger, LedgerError, Movement, StockLine, StockSnapshot};
pub use store::{Backend, InMemoryStore, InventoryStore, SettingsStore, SqliteStore, StoreError, WorkOrderStore};
pub use tracker::{BoardColumn, OrderFilter, StatusOutcome, TrackerError, WorkOrderTracker};
