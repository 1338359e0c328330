use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rollstock_auth::AuthError;
use rollstock_core::DomainError;
use rollstock_infra::{AccessError, LedgerError, StoreError, TrackerError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let msg = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", msg)
        }
        DomainError::NegativeStock { .. } => json_error(StatusCode::UNPROCESSABLE_ENTITY, "negative_stock", msg),
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::DuplicateKey(_) => json_error(StatusCode::CONFLICT, "duplicate_key", msg),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    let msg = err.to_string();
    match err {
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StoreError::DuplicateKey(_) => json_error(StatusCode::CONFLICT, "duplicate_key", msg),
        StoreError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Unavailable(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", msg),
        StoreError::Corrupt(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt_record", msg),
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let msg = err.to_string();
    match err {
        AuthError::BlankInput | AuthError::BlankCode => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::InvalidCode | AuthError::UnknownSession => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::Store(e) => store_error_to_response(e),
    }
}

pub fn tracker_error_to_response(err: TrackerError) -> axum::response::Response {
    match err {
        TrackerError::Domain(e) => domain_error_to_response(e),
        TrackerError::Store(e) => store_error_to_response(e),
    }
}

pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::Auth(e) => auth_error_to_response(e),
        AccessError::Store(e) => store_error_to_response(e),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
