use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use rollstock_inventory::{ItemPatch, StockItem};

use crate::app::routes::common::{parse_category, parse_item_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Raw material ids contain a `/`; clients percent-encode it in the `:id` segment.
pub fn router() -> Router {
    Router::new()
        .route("/:category", get(snapshot).post(register_item).put(bulk_replace))
        .route("/:category/total", get(total_quantity))
        .route("/:category/alerts", get(reorder_alerts))
        .route("/:category/items/:id", get(get_item).patch(update_item).delete(delete_item))
        .route("/:category/items/:id/movements", get(list_movements).post(record_movement))
        .route("/:category/items/:id/usage", get(usage))
        .route(
            "/:category/items/:id/reorder-level",
            get(get_reorder_level).put(set_reorder_level),
        )
}

pub async fn snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
) -> axum::response::Response {
    let category = match parse_category(&category) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger.stock_snapshot(category).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
    body: Result<Json<dto::StockItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let category = match parse_category(&category) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let item = match body.into_item(category) {
        Ok(item) => item,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.register_item(item).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn bulk_replace(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
    body: Result<Json<dto::BulkReplaceRequest>, JsonRejection>,
) -> axum::response::Response {
    let category = match parse_category(&category) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let items: Vec<StockItem> = match body
        .items
        .into_iter()
        .map(|req| req.into_item(category))
        .collect::<Result<_, _>>()
    {
        Ok(items) => items,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.bulk_replace(category, items).await {
        Ok(count) => Json(serde_json::json!({ "replaced": count })).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn total_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
) -> axum::response::Response {
    let category = match parse_category(&category) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger.total_quantity(category).await {
        Ok(total) => Json(dto::TotalResponse {
            category,
            unit: category.schema().unit,
            total_quantity: total,
        })
        .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reorder_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
) -> axum::response::Response {
    let category = match parse_category(&category) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger.reorder_alerts(category).await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.ledger.get_item(category, &id).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
    body: Result<Json<ItemPatch>, JsonRejection>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let patch = match dto::json_body(body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.ledger.update_item(category, &id, patch).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.ledger.delete_item(category, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
    body: Result<Json<dto::MovementRequest>, JsonRejection>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.ledger.apply_movement(category, &id, body.delta, &body.note).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.ledger.transactions(category, &id).await {
        Ok(log) => Json(log).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// `?year=&month=` selects a calendar month; omit both for the current one.
pub async fn usage(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
    query: Result<Query<dto::UsageQuery>, QueryRejection>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let query = match dto::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    let result = match (query.year, query.month) {
        (Some(year), Some(month)) => services.ledger.monthly_usage(category, &id, year, month).await,
        (None, None) => services.ledger.current_month_usage(category, &id).await,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "year and month must be given together",
            );
        }
    };

    match result {
        Ok(usage) => Json(dto::UsageResponse {
            category,
            item_id: id,
            year: query.year,
            month: query.month,
            usage,
        })
        .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_reorder_level(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.ledger.get_reorder_level(category, &id).await {
        Ok(threshold) => Json(dto::ReorderLevelResponse {
            category,
            item_id: id,
            threshold,
        })
        .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn set_reorder_level(
    Extension(services): Extension<Arc<AppServices>>,
    Path((category, id)): Path<(String, String)>,
    body: Result<Json<dto::ReorderLevelRequest>, JsonRejection>,
) -> axum::response::Response {
    let (category, id) = match (parse_category(&category), parse_item_id(&id)) {
        (Ok(c), Ok(id)) => (c, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.ledger.set_reorder_level(category, &id, body.threshold).await {
        Ok(level) => Json(level).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
