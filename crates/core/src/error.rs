//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (empty required field, bad enum label, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A movement would take an item's stock below zero.
    #[error("insufficient stock for {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: f64,
        requested: f64,
    },

    /// A record carries a negative stock quantity.
    #[error("stock for {item_id} cannot be negative (got {quantity})")]
    NegativeStock { item_id: String, quantity: f64 },

    /// An identifier was invalid (blank or malformed).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identifier already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Stale version / optimistic concurrency failure.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::DuplicateKey(key.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(item_id: impl Into<String>, available: f64, requested: f64) -> Self {
        Self::InsufficientStock {
            item_id: item_id.into(),
            available,
            requested,
        }
    }

    pub fn negative_stock(item_id: impl Into<String>, quantity: f64) -> Self {
        Self::NegativeStock {
            item_id: item_id.into(),
            quantity,
        }
    }
}
