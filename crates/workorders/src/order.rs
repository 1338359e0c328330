use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use rollstock_core::{Aggregate, AggregateRoot, DomainError, WorkOrderId};

use crate::status::{Priority, Unit, WorkOrderStatus};

/// Aggregate root: WorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    id: WorkOrderId,
    company: String,
    spec: String,
    quantity: u32,
    unit: Unit,
    assignee: String,
    status: WorkOrderStatus,
    priority: Priority,
    due_date: Option<NaiveDate>,
    memo: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
}

impl WorkOrder {
    /// Create an empty, not-yet-registered instance.
    pub fn empty(id: WorkOrderId) -> Self {
        Self {
            id,
            company: String::new(),
            spec: String::new(),
            quantity: 0,
            unit: Unit::default(),
            assignee: String::new(),
            status: WorkOrderStatus::INITIAL,
            priority: Priority::default(),
            due_date: None,
            memo: String::new(),
            created_at: DateTime::<Utc>::MIN_UTC,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> &WorkOrderId {
        &self.id
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn assignee(&self) -> &str {
        &self.assignee
    }

    pub fn status(&self) -> WorkOrderStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_registered(&self) -> bool {
        self.version > 0
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Operator input for a new work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub id: WorkOrderId,
    pub company: String,
    #[serde(default)]
    pub spec: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub memo: String,
}

/// Editable non-status fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkOrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Absent leaves the date alone; `null` clears it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Marks a field that appeared in the input, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl WorkOrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Command: RegisterWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWorkOrder {
    pub order: NewWorkOrder,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetStatus (unconstrained jump, manual override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStatus {
    pub status: WorkOrderStatus,
}

/// Command: EditWorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditWorkOrder {
    pub patch: WorkOrderPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderCommand {
    Register(RegisterWorkOrder),
    SetStatus(SetStatus),
    /// Move to the next pipeline status; no-op at the terminal status.
    Advance,
    Edit(EditWorkOrder),
}

/// Event: WorkOrderRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRegistered {
    pub order: NewWorkOrder,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub from: WorkOrderStatus,
    pub to: WorkOrderStatus,
}

/// Event: WorkOrderEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderEdited {
    pub patch: WorkOrderPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderEvent {
    Registered(WorkOrderRegistered),
    StatusChanged(StatusChanged),
    Edited(WorkOrderEdited),
}

impl Aggregate for WorkOrder {
    type Command = WorkOrderCommand;
    type Event = WorkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WorkOrderEvent::Registered(e) => {
                let o = &e.order;
                self.id = o.id.clone();
                self.company = o.company.trim().to_string();
                self.spec = o.spec.clone();
                self.quantity = o.quantity;
                self.unit = o.unit;
                self.assignee = o.assignee.clone();
                self.status = WorkOrderStatus::INITIAL;
                self.priority = o.priority;
                self.due_date = o.due_date;
                self.memo = o.memo.clone();
                self.created_at = e.occurred_at;
            }
            WorkOrderEvent::StatusChanged(e) => {
                self.status = e.to;
            }
            WorkOrderEvent::Edited(e) => {
                let p = &e.patch;
                if let Some(company) = &p.company {
                    self.company = company.trim().to_string();
                }
                if let Some(spec) = &p.spec {
                    self.spec = spec.clone();
                }
                if let Some(quantity) = p.quantity {
                    self.quantity = quantity;
                }
                if let Some(unit) = p.unit {
                    self.unit = unit;
                }
                if let Some(assignee) = &p.assignee {
                    self.assignee = assignee.clone();
                }
                if let Some(priority) = p.priority {
                    self.priority = priority;
                }
                if let Some(due_date) = p.due_date {
                    self.due_date = due_date;
                }
                if let Some(memo) = &p.memo {
                    self.memo = memo.clone();
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WorkOrderCommand::Register(cmd) => self.handle_register(cmd),
            WorkOrderCommand::SetStatus(cmd) => self.handle_set_status(cmd),
            WorkOrderCommand::Advance => self.handle_advance(),
            WorkOrderCommand::Edit(cmd) => self.handle_edit(cmd),
        }
    }
}

impl WorkOrder {
    fn ensure_registered(&self) -> Result<(), DomainError> {
        if !self.is_registered() {
            return Err(DomainError::not_found(format!("work order {}", self.id)));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if self.is_registered() {
            return Err(DomainError::duplicate(format!("work order {}", cmd.order.id)));
        }
        if cmd.order.id != self.id {
            return Err(DomainError::invalid_id("work order id mismatch"));
        }
        if cmd.order.company.trim().is_empty() {
            return Err(DomainError::validation("company is required"));
        }
        if cmd.order.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        Ok(vec![WorkOrderEvent::Registered(WorkOrderRegistered {
            order: cmd.order.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(&self, cmd: &SetStatus) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_registered()?;
        if cmd.status == self.status {
            return Ok(vec![]);
        }
        Ok(vec![WorkOrderEvent::StatusChanged(StatusChanged {
            from: self.status,
            to: cmd.status,
        })])
    }

    fn handle_advance(&self) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_registered()?;
        Ok(self
            .status
            .next()
            .map(|to| {
                WorkOrderEvent::StatusChanged(StatusChanged {
                    from: self.status,
                    to,
                })
            })
            .into_iter()
            .collect())
    }

    fn handle_edit(&self, cmd: &EditWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        self.ensure_registered()?;
        if cmd.patch.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if cmd.patch.company.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(DomainError::validation("company is required"));
        }
        if cmd.patch.quantity == Some(0) {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        Ok(vec![WorkOrderEvent::Edited(WorkOrderEdited {
            patch: cmd.patch.clone(),
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_order_id() -> WorkOrderId {
        WorkOrderId::new("W-TEST").unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    fn new_order() -> NewWorkOrder {
        NewWorkOrder {
            id: test_order_id(),
            company: "CLIENT".to_string(),
            spec: "0.05T x 50cm x 70cm".to_string(),
            quantity: 3,
            unit: Unit::Sheet,
            assignee: "kim".to_string(),
            priority: Priority::Normal,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            memo: "note".to_string(),
        }
    }

    fn registered() -> WorkOrder {
        let mut order = WorkOrder::empty(test_order_id());
        order
            .execute(&WorkOrderCommand::Register(RegisterWorkOrder {
                order: new_order(),
                occurred_at: test_time(),
            }))
            .unwrap();
        order
    }

    #[test]
    fn register_starts_in_received() {
        let order = registered();
        assert_eq!(order.status(), WorkOrderStatus::Received);
        assert_eq!(order.company(), "CLIENT");
        assert_eq!(order.quantity(), 3);
        assert_eq!(order.created_at(), test_time());
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn register_twice_is_duplicate() {
        let order = registered();
        let err = order
            .handle(&WorkOrderCommand::Register(RegisterWorkOrder {
                order: new_order(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
    }

    #[test]
    fn register_requires_company_and_quantity() {
        let order = WorkOrder::empty(test_order_id());
        let mut input = new_order();
        input.company = "  ".to_string();
        let cmd = WorkOrderCommand::Register(RegisterWorkOrder {
            order: input,
            occurred_at: test_time(),
        });
        assert!(matches!(order.handle(&cmd), Err(DomainError::Validation(_))));

        let mut input = new_order();
        input.quantity = 0;
        let cmd = WorkOrderCommand::Register(RegisterWorkOrder {
            order: input,
            occurred_at: test_time(),
        });
        assert!(matches!(order.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn advance_walks_pipeline_then_stops() {
        let mut order = registered();
        let expected = [
            WorkOrderStatus::InProduction,
            WorkOrderStatus::Cutting,
            WorkOrderStatus::Done,
            WorkOrderStatus::Delivered,
        ];
        for status in expected {
            let events = order.execute(&WorkOrderCommand::Advance).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(order.status(), status);
        }

        let version = order.version();
        let events = order.execute(&WorkOrderCommand::Advance).unwrap();
        assert!(events.is_empty());
        assert_eq!(order.status(), WorkOrderStatus::Delivered);
        assert_eq!(order.version(), version);
    }

    #[test]
    fn set_status_can_jump_anywhere() {
        let mut order = registered();
        order
            .execute(&WorkOrderCommand::SetStatus(SetStatus {
                status: WorkOrderStatus::Delivered,
            }))
            .unwrap();
        assert_eq!(order.status(), WorkOrderStatus::Delivered);

        order
            .execute(&WorkOrderCommand::SetStatus(SetStatus {
                status: WorkOrderStatus::InProduction,
            }))
            .unwrap();
        assert_eq!(order.status(), WorkOrderStatus::InProduction);
    }

    #[test]
    fn edit_changes_fields_but_not_status() {
        let mut order = registered();
        order.execute(&WorkOrderCommand::Advance).unwrap();
        order
            .execute(&WorkOrderCommand::Edit(EditWorkOrder {
                patch: WorkOrderPatch {
                    company: Some("NewClient".to_string()),
                    quantity: Some(5),
                    priority: Some(Priority::Urgent),
                    ..WorkOrderPatch::default()
                },
            }))
            .unwrap();

        assert_eq!(order.company(), "NewClient");
        assert_eq!(order.quantity(), 5);
        assert_eq!(order.priority(), Priority::Urgent);
        assert_eq!(order.status(), WorkOrderStatus::InProduction);
        assert_eq!(order.spec(), "0.05T x 50cm x 70cm");
    }

    #[test]
    fn due_date_is_kept_when_absent_and_cleared_by_null() {
        let mut order = registered();

        let patch: WorkOrderPatch = serde_json::from_str(r#"{"memo":"rush"}"#).unwrap();
        assert_eq!(patch.due_date, None);
        order.execute(&WorkOrderCommand::Edit(EditWorkOrder { patch })).unwrap();
        assert_eq!(order.due_date(), NaiveDate::from_ymd_opt(2026, 1, 10));

        let patch: WorkOrderPatch = serde_json::from_str(r#"{"due_date":"2026-02-01"}"#).unwrap();
        order.execute(&WorkOrderCommand::Edit(EditWorkOrder { patch })).unwrap();
        assert_eq!(order.due_date(), NaiveDate::from_ymd_opt(2026, 2, 1));

        let patch: WorkOrderPatch = serde_json::from_str(r#"{"due_date":null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert!(!patch.is_empty());
        order.execute(&WorkOrderCommand::Edit(EditWorkOrder { patch: patch.clone() })).unwrap();
        assert_eq!(order.due_date(), None);

        // The clear survives a serialize round trip of the recorded event.
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"due_date":null}"#);
        assert_eq!(serde_json::from_str::<WorkOrderPatch>(&json).unwrap(), patch);
    }

    #[test]
    fn commands_on_unregistered_order_are_not_found() {
        let order = WorkOrder::empty(test_order_id());
        assert!(matches!(
            order.handle(&WorkOrderCommand::Advance),
            Err(DomainError::NotFound(_))
        ));
    }
}
