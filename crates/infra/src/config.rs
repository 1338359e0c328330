//! Process configuration loaded from environment variables.
//!
//! | variable | default |
//! |----------|---------|
//! | `ROLLSTOCK_BACKEND` | `sqlite` (`memory` for a throwaway store) |
//! | `DATABASE_URL` | `sqlite://inventory.db?mode=rwc` |
//! | `COMPANY_CODE` | `2026` |
//! | `ROLLSTOCK_BIND` | `0.0.0.0:8080` |
//! | `ROLLSTOCK_LOG_FORMAT` | `json` (`pretty` for humans) |

use std::net::SocketAddr;

use thiserror::Error;

use rollstock_auth::{CompanyCode, DEFAULT_COMPANY_CODE};
pub use rollstock_observability::LogFormat;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db?mode=rwc";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub database_url: String,
    /// Seeded into the settings store only when none is stored yet.
    pub default_company_code: CompanyCode,
    pub bind: SocketAddr,
    pub log_format: LogFormat,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("ROLLSTOCK_BACKEND").as_deref() {
            None | Some("sqlite") => BackendKind::Sqlite,
            Some("memory") => BackendKind::Memory,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "ROLLSTOCK_BACKEND",
                    format!("expected 'memory' or 'sqlite', got '{other}'"),
                ));
            }
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| {
            if backend == BackendKind::Sqlite {
                tracing::warn!("DATABASE_URL not set; using {DEFAULT_DATABASE_URL}");
            }
            DEFAULT_DATABASE_URL.to_string()
        });

        let default_company_code = match get("COMPANY_CODE") {
            Some(code) => CompanyCode::new(code).map_err(|e| ConfigError::invalid("COMPANY_CODE", e.to_string()))?,
            None => {
                tracing::warn!("COMPANY_CODE not set; using insecure default {DEFAULT_COMPANY_CODE}");
                CompanyCode::default()
            }
        };

        let bind = get("ROLLSTOCK_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("ROLLSTOCK_BIND", e.to_string()))?;

        let log_format = match get("ROLLSTOCK_LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "ROLLSTOCK_LOG_FORMAT",
                    format!("expected 'json' or 'pretty', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            backend,
            database_url,
            default_company_code,
            bind,
            log_format,
        })
    }
}
