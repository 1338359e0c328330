//! Append-only transaction log records and usage windows.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use rollstock_core::{DomainError, DomainResult, ItemId};

use crate::category::ItemCategory;

/// Default note recorded for positive movements.
pub const NOTE_INBOUND: &str = "inbound";
/// Default note recorded for negative movements.
pub const NOTE_OUTBOUND: &str = "outbound";

/// One logged quantity delta. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub category: ItemCategory,
    /// Not enforced as a foreign key; the item may since have been deleted.
    pub item_id: ItemId,
    pub delta: f64,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_outbound(&self) -> bool {
        self.delta < 0.0
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    /// The calendar month `year-month`, rolling December into next January.
    pub fn month(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("month must be 1..=12, got {month}")));
        }
        let (next_year, next_month) = if month == 12 {
            let next_year = year
                .checked_add(1)
                .ok_or_else(|| DomainError::validation(format!("year {year} is out of range")))?;
            (next_year, 1)
        } else {
            (year, month + 1)
        };
        Ok(Self {
            start: first_of_month(year, month)?,
            end: first_of_month(next_year, next_month)?,
        })
    }

    /// The calendar month containing `at`.
    pub fn containing(at: DateTime<Utc>) -> Self {
        // Month derived from a valid timestamp is always in range.
        Self::month(at.year(), at.month()).unwrap_or(Self { start: at, end: at })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn first_of_month(year: i32, month: u32) -> DomainResult<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DomainError::validation(format!("invalid year/month {year}-{month}")))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DomainError::validation("invalid midnight"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Sum of `-delta` over outbound transactions inside `window`.
pub fn outbound_usage<'a>(transactions: impl IntoIterator<Item = &'a Transaction>, window: UsageWindow) -> f64 {
    transactions
        .into_iter()
        .filter(|t| t.is_outbound() && window.contains(t.occurred_at))
        .map(|t| -t.delta)
        .sum()
}
