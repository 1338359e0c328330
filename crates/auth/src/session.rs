use core::str::FromStr;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthError;

/// Opaque bearer token identifying a logged-in operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionToken {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s.trim())
            .map(Self)
            .map_err(|_| AuthError::UnknownSession)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub opened_at: DateTime<Utc>,
}

/// Live sessions, held only in process memory.
///
/// Restarting the process logs everyone out.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<HashMap<SessionToken, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, now: DateTime<Utc>) -> Session {
        let session = Session {
            token: SessionToken::new(),
            opened_at: now,
        };
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(session.token, session.clone());
        session
    }

    pub fn validate(&self, token: &SessionToken) -> Result<Session, AuthError> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(token).cloned().ok_or(AuthError::UnknownSession)
    }

    /// Returns `true` if a session was removed.
    pub fn close(&self, token: &SessionToken) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_validate_close() {
        let registry = SessionRegistry::new();
        let session = registry.open(Utc::now());

        assert_eq!(registry.validate(&session.token).unwrap(), session);
        assert!(registry.close(&session.token));
        assert_eq!(registry.validate(&session.token), Err(AuthError::UnknownSession));
        assert!(!registry.close(&session.token));
        assert!(registry.is_empty());
    }

    #[test]
    fn tokens_are_distinct() {
        let registry = SessionRegistry::new();
        let a = registry.open(Utc::now());
        let b = registry.open(Utc::now());
        assert_ne!(a.token, b.token);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn token_parse_round_trips_through_display() {
        let token = SessionToken::new();
        let parsed: SessionToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
        assert!("not-a-token".parse::<SessionToken>().is_err());
    }
}
