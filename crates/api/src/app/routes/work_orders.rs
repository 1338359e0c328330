use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use rollstock_workorders::{NewWorkOrder, WorkOrderPatch, WorkOrderStatus};

use crate::app::routes::common::parse_order_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(register_order))
        .route("/board", get(board))
        .route("/purge", post(purge_delivered))
        .route("/:id", get(get_order).patch(edit_order).delete(delete_order))
        .route("/:id/status", put(set_status))
        .route("/:id/advance", post(advance))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListOrdersQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.tracker.list(query.filter).await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn register_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewWorkOrder>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.tracker.register(body).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn board(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.tracker.board().await {
        Ok(columns) => Json(columns).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

/// Removes the listed orders that are delivered and reports which ones went.
pub async fn purge_delivered(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::PurgeRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.tracker.purge_delivered(&body.ids).await {
        Ok(removed) => Json(serde_json::json!({ "removed": removed })).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.tracker.get(&id).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn edit_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<WorkOrderPatch>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let patch = match dto::json_body(body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.tracker.edit(&id, patch).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.tracker.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::SetStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let status: WorkOrderStatus = match body.status.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.tracker.set_status(&id, status).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}

pub async fn advance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.tracker.advance(&id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::tracker_error_to_response(e),
    }
}
