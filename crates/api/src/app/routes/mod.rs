use axum::{
    routing::{get, post, put},
    Router,
};

pub mod common;
pub mod inventory;
pub mod session;
pub mod system;
pub mod work_orders;

/// Router for all endpoints that require a session.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(session::whoami))
        .route("/logout", post(session::logout))
        .route("/settings/company-code", put(session::rotate_code))
        .nest("/inventory", inventory::router())
        .nest("/work-orders", work_orders::router())
}
