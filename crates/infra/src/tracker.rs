//! Work order tracker: registration, status moves and bulk purge.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use rollstock_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, WorkOrderId};
use rollstock_workorders::{
    EditWorkOrder, NewWorkOrder, RegisterWorkOrder, SetStatus, WorkOrder, WorkOrderCommand, WorkOrderPatch,
    WorkOrderStatus,
};

use crate::clock::{Clock, SystemClock};
use crate::store::{StoreError, WorkOrderStore};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFilter {
    /// Everything not yet delivered (the board).
    #[default]
    Active,
    Delivered,
    All,
}

impl OrderFilter {
    fn admits(self, status: WorkOrderStatus) -> bool {
        match self {
            OrderFilter::Active => !status.is_terminal(),
            OrderFilter::Delivered => status.is_terminal(),
            OrderFilter::All => true,
        }
    }
}

/// Outcome of a status command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusOutcome {
    pub order: WorkOrder,
    /// `false` when the command left the status as it was (e.g. advancing
    /// an already delivered order).
    pub changed: bool,
}

/// One column of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: WorkOrderStatus,
    pub label: &'static str,
    pub orders: Vec<WorkOrder>,
}

#[derive(Debug, Clone)]
pub struct WorkOrderTracker<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> WorkOrderTracker<S, SystemClock>
where
    S: WorkOrderStore,
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S, C> WorkOrderTracker<S, C>
where
    S: WorkOrderStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    async fn require(&self, id: &WorkOrderId) -> Result<WorkOrder, TrackerError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("work order {id}")).into())
    }

    #[instrument(skip(self, new), fields(order_id = %new.id), err)]
    pub async fn register(&self, new: NewWorkOrder) -> Result<WorkOrder, TrackerError> {
        let mut order = WorkOrder::empty(new.id.clone());
        order.execute(&WorkOrderCommand::Register(RegisterWorkOrder {
            order: new,
            occurred_at: self.clock.now(),
        }))?;

        self.store.insert_order(order.clone()).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => TrackerError::from(DomainError::duplicate(format!(
                "work order {}",
                order.id_typed()
            ))),
            other => other.into(),
        })?;

        info!(company = order.company(), "work order registered");
        Ok(order)
    }

    pub async fn get(&self, id: &WorkOrderId) -> Result<WorkOrder, TrackerError> {
        self.require(id).await
    }

    /// Orders matching `filter`, by creation time then id.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<WorkOrder>, TrackerError> {
        let orders = self.store.list_orders().await?;
        Ok(orders.into_iter().filter(|o| filter.admits(o.status())).collect())
    }

    /// Active orders grouped by status, in pipeline order.
    pub async fn board(&self) -> Result<Vec<BoardColumn>, TrackerError> {
        let active = self.list(OrderFilter::Active).await?;
        Ok(WorkOrderStatus::PIPELINE
            .into_iter()
            .filter(|status| !status.is_terminal())
            .map(|status| BoardColumn {
                status,
                label: status.label(),
                orders: active.iter().filter(|o| o.status() == status).cloned().collect(),
            })
            .collect())
    }

    /// Jump to any status.
    #[instrument(skip(self), err)]
    pub async fn set_status(&self, id: &WorkOrderId, status: WorkOrderStatus) -> Result<StatusOutcome, TrackerError> {
        self.run(id, WorkOrderCommand::SetStatus(SetStatus { status })).await
    }

    /// Move to the next status; unchanged when already delivered.
    #[instrument(skip(self), err)]
    pub async fn advance(&self, id: &WorkOrderId) -> Result<StatusOutcome, TrackerError> {
        self.run(id, WorkOrderCommand::Advance).await
    }

    #[instrument(skip(self, patch), err)]
    pub async fn edit(&self, id: &WorkOrderId, patch: WorkOrderPatch) -> Result<WorkOrder, TrackerError> {
        let outcome = self.run(id, WorkOrderCommand::Edit(EditWorkOrder { patch })).await?;
        Ok(outcome.order)
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: &WorkOrderId) -> Result<(), TrackerError> {
        match self.store.delete_order(id).await {
            Ok(()) => {
                info!("work order deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(DomainError::not_found(format!("work order {id}")).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the listed orders that are delivered; others are skipped.
    /// Returns the ids actually removed.
    #[instrument(skip(self, ids), fields(requested = ids.len()), err)]
    pub async fn purge_delivered(&self, ids: &[WorkOrderId]) -> Result<Vec<WorkOrderId>, TrackerError> {
        let mut removed = Vec::new();
        for id in ids {
            let Some(order) = self.store.get_order(id).await? else {
                continue;
            };
            if !order.status().is_terminal() {
                continue;
            }
            match self.store.delete_order(id).await {
                Ok(()) => removed.push(id.clone()),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(removed = removed.len(), "delivered work orders purged");
        Ok(removed)
    }

    async fn run(&self, id: &WorkOrderId, command: WorkOrderCommand) -> Result<StatusOutcome, TrackerError> {
        let mut order = self.require(id).await?;
        let read_version = order.version();

        let events = order.execute(&command)?;
        if events.is_empty() {
            return Ok(StatusOutcome { order, changed: false });
        }

        self.store
            .update_order(order.clone(), ExpectedVersion::Exact(read_version))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(msg) => TrackerError::from(DomainError::conflict(msg)),
                other => other.into(),
            })?;
        info!(status = %order.status(), "work order updated");
        Ok(StatusOutcome { order, changed: true })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rollstock_workorders::{Priority, Unit};

    use super::*;
    use crate::clock::FixedClock;
    use crate::store::InMemoryStore;

    fn tracker() -> WorkOrderTracker<Arc<InMemoryStore>, FixedClock> {
        WorkOrderTracker::with_clock(
            Arc::new(InMemoryStore::new()),
            FixedClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()),
        )
    }

    fn wid(raw: &str) -> WorkOrderId {
        WorkOrderId::new(raw).unwrap()
    }

    fn new_order(raw: &str, company: &str) -> NewWorkOrder {
        NewWorkOrder {
            id: wid(raw),
            company: company.to_string(),
            spec: "0.05T 50x70".to_string(),
            quantity: 10,
            unit: Unit::Sheet,
            assignee: String::new(),
            priority: Priority::default(),
            due_date: None,
            memo: String::new(),
        }
    }

    #[tokio::test]
    async fn advance_through_the_pipeline() {
        let tracker = tracker();
        tracker.register(new_order("W-1", "ACME")).await.unwrap();

        let expected = [
            WorkOrderStatus::InProduction,
            WorkOrderStatus::Cutting,
            WorkOrderStatus::Done,
            WorkOrderStatus::Delivered,
        ];
        for status in expected {
            let outcome = tracker.advance(&wid("W-1")).await.unwrap();
            assert!(outcome.changed);
            assert_eq!(outcome.order.status(), status);
        }

        let outcome = tracker.advance(&wid("W-1")).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.order.status(), WorkOrderStatus::Delivered);
        assert_eq!(tracker.get(&wid("W-1")).await.unwrap().status(), WorkOrderStatus::Delivered);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first() {
        let tracker = tracker();
        tracker.register(new_order("W-1", "First")).await.unwrap();
        let err = tracker.register(new_order("W-1", "Second")).await.unwrap_err();
        assert!(matches!(err, TrackerError::Domain(DomainError::DuplicateKey(_))));
        assert_eq!(tracker.get(&wid("W-1")).await.unwrap().company(), "First");
    }

    #[tokio::test]
    async fn filters_board_and_purge() {
        let tracker = tracker();
        tracker.register(new_order("W-1", "A")).await.unwrap();
        tracker.register(new_order("W-2", "B")).await.unwrap();
        tracker.register(new_order("W-3", "C")).await.unwrap();
        tracker.set_status(&wid("W-2"), WorkOrderStatus::Delivered).await.unwrap();
        tracker.set_status(&wid("W-3"), WorkOrderStatus::Cutting).await.unwrap();

        assert_eq!(tracker.list(OrderFilter::Active).await.unwrap().len(), 2);
        assert_eq!(tracker.list(OrderFilter::Delivered).await.unwrap().len(), 1);
        assert_eq!(tracker.list(OrderFilter::All).await.unwrap().len(), 3);

        let board = tracker.board().await.unwrap();
        assert_eq!(board.len(), 4);
        assert_eq!(board[0].status, WorkOrderStatus::Received);
        assert_eq!(board[0].orders.len(), 1);
        assert_eq!(board[2].orders[0].id_typed(), &wid("W-3"));

        let removed = tracker
            .purge_delivered(&[wid("W-1"), wid("W-2"), wid("W-404")])
            .await
            .unwrap();
        assert_eq!(removed, vec![wid("W-2")]);
        assert_eq!(tracker.list(OrderFilter::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn edit_and_delete() {
        let tracker = tracker();
        tracker.register(new_order("W-1", "A")).await.unwrap();

        let edited = tracker
            .edit(
                &wid("W-1"),
                WorkOrderPatch {
                    memo: Some("rush".to_string()),
                    ..WorkOrderPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.memo(), "rush");

        tracker.delete(&wid("W-1")).await.unwrap();
        assert!(matches!(
            tracker.delete(&wid("W-1")).await,
            Err(TrackerError::Domain(DomainError::NotFound(_)))
        ));
        assert!(matches!(
            tracker.advance(&wid("W-1")).await,
            Err(TrackerError::Domain(DomainError::NotFound(_)))
        ));
    }
}
