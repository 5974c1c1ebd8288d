//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Validation(_)
        | DomainError::UnknownReference { .. }
        | DomainError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AlreadyClosed { .. }
        | DomainError::InUse { .. }
        | DomainError::Infrastructure(StoreError::DuplicateIdempotencyKey(_)) => {
            StatusCode::CONFLICT
        }
        DomainError::Infrastructure(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
