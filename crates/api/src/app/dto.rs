use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rollstock_core::{DomainError, ItemId, WorkOrderId};
use rollstock_infra::OrderFilter;
use rollstock_inventory::{ItemAttributes, ItemCategory, StockItem};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RotateCodeRequest {
    pub code: String,
}

/// A stock record as submitted by the operator.
///
/// `id` may be omitted for raw materials; it is then derived from name and grade.
#[derive(Debug, Deserialize)]
pub struct StockItemRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub quantity: f64,
    pub attributes: ItemAttributes,
}

impl StockItemRequest {
    pub fn into_item(self, category: ItemCategory) -> Result<StockItem, DomainError> {
        if self.attributes.category() != category {
            return Err(DomainError::validation(format!(
                "attributes describe a {} item, expected {category}",
                self.attributes.category()
            )));
        }

        match (self.id, self.attributes) {
            (Some(raw), attributes) => Ok(StockItem::new(ItemId::new(raw)?, attributes, self.quantity, Utc::now())),
            (
                None,
                ItemAttributes::RawMaterial {
                    name,
                    grade,
                    received_on,
                    note,
                },
            ) => StockItem::raw_material(&name, &grade, self.quantity, received_on, note, Utc::now()),
            (None, _) => Err(DomainError::invalid_id("item id is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkReplaceRequest {
    pub items: Vec<StockItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub delta: f64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderLevelRequest {
    pub threshold: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub filter: OrderFilter,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Either the machine name (`cutting`) or the board label.
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub ids: Vec<WorkOrderId>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub category: ItemCategory,
    pub item_id: ItemId,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub usage: f64,
}

#[derive(Debug, Serialize)]
pub struct ReorderLevelResponse {
    pub category: ItemCategory,
    pub item_id: ItemId,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub category: ItemCategory,
    pub unit: &'static str,
    pub total_quantity: f64,
}

// -------------------------
// Helpers
// -------------------------

/// Unwrap a JSON body, answering malformed input with the usual error shape.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()))
}

pub fn query_params<T>(
    query: Result<axum::extract::Query<T>, axum::extract::rejection::QueryRejection>,
) -> Result<T, axum::response::Response> {
    query
        .map(|axum::extract::Query(value)| value)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()))
}
