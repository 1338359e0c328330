//! Operator access: the stored company code plus live sessions.

use thiserror::Error;
use tracing::{info, warn};

use rollstock_auth::{AuthError, CompanyCode, Session, SessionRegistry, SessionToken, check_code};

use crate::clock::{Clock, SystemClock};
use crate::store::{COMPANY_CODE_KEY, SettingsStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AccessControl<S, C = SystemClock> {
    store: S,
    clock: C,
    default_code: CompanyCode,
    sessions: SessionRegistry,
}

impl<S> AccessControl<S, SystemClock>
where
    S: SettingsStore,
{
    pub fn new(store: S, default_code: CompanyCode) -> Self {
        Self::with_clock(store, SystemClock, default_code)
    }
}

impl<S, C> AccessControl<S, C>
where
    S: SettingsStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C, default_code: CompanyCode) -> Self {
        Self {
            store,
            clock,
            default_code,
            sessions: SessionRegistry::new(),
        }
    }

    /// The stored code, seeding the configured default when none is stored yet.
    pub async fn company_code(&self) -> Result<CompanyCode, AccessError> {
        match self.store.get_setting(COMPANY_CODE_KEY).await? {
            Some(raw) => CompanyCode::new(raw)
                .map_err(|_| StoreError::Corrupt(format!("setting {COMPANY_CODE_KEY} is blank")).into()),
            None => {
                self.store
                    .put_setting(COMPANY_CODE_KEY, self.default_code.as_str())
                    .await?;
                info!("company code seeded from configuration");
                Ok(self.default_code.clone())
            }
        }
    }

    pub async fn login(&self, input: &str) -> Result<Session, AccessError> {
        let expected = self.company_code().await?;
        check_code(&expected, input).map_err(|e| {
            warn!(error = %e, "login rejected");
            e
        })?;

        let session = self.sessions.open(self.clock.now());
        info!(token = %session.token, "operator logged in");
        Ok(session)
    }

    pub fn authenticate(&self, token: &SessionToken) -> Result<Session, AccessError> {
        Ok(self.sessions.validate(token)?)
    }

    pub fn logout(&self, token: &SessionToken) -> Result<(), AccessError> {
        if self.sessions.close(token) {
            info!(%token, "operator logged out");
            Ok(())
        } else {
            Err(AuthError::UnknownSession.into())
        }
    }

    /// Replace the stored company code. Existing sessions stay valid.
    pub async fn rotate_code(&self, new_code: &str) -> Result<CompanyCode, AccessError> {
        let code = CompanyCode::new(new_code)?;
        self.store.put_setting(COMPANY_CODE_KEY, code.as_str()).await?;
        info!("company code rotated");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryStore;

    fn access(store: Arc<InMemoryStore>) -> AccessControl<Arc<InMemoryStore>> {
        AccessControl::new(store, CompanyCode::new("2026").unwrap())
    }

    #[tokio::test]
    async fn default_code_is_seeded_into_settings() {
        let store = Arc::new(InMemoryStore::new());
        let access = access(store.clone());

        assert_eq!(access.company_code().await.unwrap().as_str(), "2026");
        assert_eq!(
            store.get_setting(COMPANY_CODE_KEY).await.unwrap().as_deref(),
            Some("2026")
        );
    }

    #[tokio::test]
    async fn stored_code_wins_over_default() {
        let store = Arc::new(InMemoryStore::new());
        store.put_setting(COMPANY_CODE_KEY, "4242").await.unwrap();
        let access = access(store);

        assert!(matches!(
            access.login("2026").await,
            Err(AccessError::Auth(AuthError::InvalidCode))
        ));
        assert!(access.login("4242").await.is_ok());
    }

    #[tokio::test]
    async fn login_logout_and_rotate() {
        let access = access(Arc::new(InMemoryStore::new()));

        assert!(matches!(
            access.login("  ").await,
            Err(AccessError::Auth(AuthError::BlankInput))
        ));

        let session = access.login("2026").await.unwrap();
        assert!(access.authenticate(&session.token).is_ok());

        access.rotate_code("9999").await.unwrap();
        assert!(access.authenticate(&session.token).is_ok());
        assert!(access.login("2026").await.is_err());
        assert!(access.login("9999").await.is_ok());

        access.logout(&session.token).unwrap();
        assert!(matches!(
            access.authenticate(&session.token),
            Err(AccessError::Auth(AuthError::UnknownSession))
        ));
    }
}
