//! Path segment parsing shared by the route modules.

use rollstock_core::{ItemId, WorkOrderId};
use rollstock_inventory::ItemCategory;

use crate::app::errors;

pub fn parse_category(raw: &str) -> Result<ItemCategory, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_item_id(raw: &str) -> Result<ItemId, axum::response::Response> {
    ItemId::new(raw).map_err(errors::domain_error_to_response)
}

pub fn parse_order_id(raw: &str) -> Result<WorkOrderId, axum::response::Response> {
    WorkOrderId::new(raw).map_err(errors::domain_error_to_response)
}
