use chrono::{DateTime, Utc};

use rollstock_auth::{Session, SessionToken};

/// Operator session attached to every protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: SessionToken,
    opened_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            token: session.token,
            opened_at: session.opened_at,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
}
