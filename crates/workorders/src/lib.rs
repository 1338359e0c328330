//! Work order domain module.
//!
//! A production task moving through a fixed status pipeline
//! (접수 → 생산중 → 재단중 → 완료 → 납품완료). Pure domain logic, no IO.

pub mod order;
pub mod status;

pub use order::{
    EditWorkOrder, NewWorkOrder, RegisterWorkOrder, SetStatus, StatusChanged, WorkOrder, WorkOrderCommand,
    WorkOrderEdited, WorkOrderEvent, WorkOrderPatch, WorkOrderRegistered,
};
pub use status::{Priority, Unit, WorkOrderStatus};
