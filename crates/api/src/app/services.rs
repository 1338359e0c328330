//! Service wiring: one shared backend behind the ledger, tracker and access
//! control.

use std::sync::Arc;

use rollstock_auth::CompanyCode;
use rollstock_infra::{
    AccessControl, AppConfig, Backend, BackendKind, InMemoryStore, Ledger, SqliteStore, StoreError, WorkOrderTracker,
};

pub type SharedBackend = Arc<dyn Backend>;

pub struct AppServices {
    pub ledger: Ledger<SharedBackend>,
    pub tracker: WorkOrderTracker<SharedBackend>,
    pub access: AccessControl<SharedBackend>,
}

impl AppServices {
    pub fn new(backend: SharedBackend, default_code: CompanyCode) -> Self {
        Self {
            ledger: Ledger::new(backend.clone()),
            tracker: WorkOrderTracker::new(backend.clone()),
            access: AccessControl::new(backend, default_code),
        }
    }

    /// Throwaway in-process store, used by tests and `ROLLSTOCK_BACKEND=memory`.
    pub fn in_memory(default_code: CompanyCode) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), default_code)
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let backend: SharedBackend = match config.backend {
        BackendKind::Memory => {
            tracing::warn!("using the in-memory backend; data is lost on exit");
            Arc::new(InMemoryStore::new())
        }
        BackendKind::Sqlite => {
            let store = SqliteStore::connect(&config.database_url).await?;
            tracing::info!(url = %config.database_url, "sqlite backend ready");
            Arc::new(store)
        }
    };

    Ok(AppServices::new(backend, config.default_company_code.clone()))
}
