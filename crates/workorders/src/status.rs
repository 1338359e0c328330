//! Fixed enumerations of the work-order board.
//!
//! Each enum serialises as English snake_case and parses from either that
//! name or the Korean label used on the shop floor.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use rollstock_core::DomainError;

/// Work order status pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// 접수
    Received,
    /// 생산중
    InProduction,
    /// 재단중
    Cutting,
    /// 완료
    Done,
    /// 납품완료
    Delivered,
}

impl WorkOrderStatus {
    /// The pipeline order; drives both manual choices and `next()`.
    pub const PIPELINE: [WorkOrderStatus; 5] = [
        WorkOrderStatus::Received,
        WorkOrderStatus::InProduction,
        WorkOrderStatus::Cutting,
        WorkOrderStatus::Done,
        WorkOrderStatus::Delivered,
    ];

    pub const INITIAL: WorkOrderStatus = WorkOrderStatus::Received;
    pub const TERMINAL: WorkOrderStatus = WorkOrderStatus::Delivered;

    pub fn label(self) -> &'static str {
        match self {
            WorkOrderStatus::Received => "접수",
            WorkOrderStatus::InProduction => "생산중",
            WorkOrderStatus::Cutting => "재단중",
            WorkOrderStatus::Done => "완료",
            WorkOrderStatus::Delivered => "납품완료",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::Received => "received",
            WorkOrderStatus::InProduction => "in_production",
            WorkOrderStatus::Cutting => "cutting",
            WorkOrderStatus::Done => "done",
            WorkOrderStatus::Delivered => "delivered",
        }
    }

    /// Next status in the pipeline; `None` at the terminal status.
    pub fn next(self) -> Option<WorkOrderStatus> {
        let pos = Self::PIPELINE.iter().position(|s| *s == self)?;
        Self::PIPELINE.get(pos + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }
}

impl core::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::PIPELINE
            .into_iter()
            .find(|st| st.label() == s || st.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown work order status '{s}'")))
    }
}

/// Work order priority (unordered set of labels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// 긴급
    Urgent,
    /// 높음
    High,
    /// 보통
    #[default]
    Normal,
    /// 낮음
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Urgent, Priority::High, Priority::Normal, Priority::Low];

    pub fn label(self) -> &'static str {
        match self {
            Priority::Urgent => "긴급",
            Priority::High => "높음",
            Priority::Normal => "보통",
            Priority::Low => "낮음",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s || p.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown priority '{s}'")))
    }
}

/// Unit a work order quantity is counted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// 장
    #[default]
    Sheet,
    /// 롤
    Roll,
    /// kg
    Kg,
    /// m
    Meter,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Sheet, Unit::Roll, Unit::Kg, Unit::Meter];

    pub fn label(self) -> &'static str {
        match self {
            Unit::Sheet => "장",
            Unit::Roll => "롤",
            Unit::Kg => "kg",
            Unit::Meter => "m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Sheet => "sheet",
            Unit::Roll => "roll",
            Unit::Kg => "kg",
            Unit::Meter => "meter",
        }
    }
}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|u| u.label() == s || u.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown unit '{s}'")))
    }
}
