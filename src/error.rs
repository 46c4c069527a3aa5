//! Error types and HTTP error response handling.
//!
//! This module defines the errors handlers return and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::{ConstraintKind, StoreError};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Request Errors**: malformed bodies, parameters or currencies
/// - **Authentication Errors**: missing, invalid or expired tokens, wrong owner
/// - **Resource Errors**: requested rows not found
/// - **Store Errors**: anything the ledger store reports, classified by variant
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials, or the caller does not own the resource.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(String),

    /// Failure reported by the ledger store.
    ///
    /// Status depends on the variant, see `IntoResponse`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected failure outside the store (hashing, token signing).
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidRequest`, `Store(Validation)` → 400 Bad Request
/// - `Unauthorized` → 401 Unauthorized
/// - `Store(Persistence)` on unique or foreign-key violations → 403 Forbidden
/// - `NotFound`, `Store(NotFound)` → 404 Not Found
/// - `Store(Transaction | RollbackFailed)` → 500 with code `transaction_error`
/// - Everything else → 500 Internal Server Error (details logged, hidden from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Store(err) => match err {
                StoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
                }
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
                StoreError::Persistence {
                    kind: ConstraintKind::UniqueViolation,
                    ..
                } => (
                    StatusCode::FORBIDDEN,
                    "unique_violation",
                    "resource already exists".to_string(),
                ),
                StoreError::Persistence {
                    kind: ConstraintKind::ForeignKeyViolation,
                    ..
                } => (
                    StatusCode::FORBIDDEN,
                    "foreign_key_violation",
                    "resource is referenced by or references missing rows".to_string(),
                ),
                StoreError::Persistence { .. } => {
                    tracing::error!(error = %err, "store persistence failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
                StoreError::Transaction(_) | StoreError::RollbackFailed { .. } => {
                    tracing::error!(error = %err, "store transaction failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "transaction_error",
                        "The transaction could not be completed".to_string(),
                    )
                }
            },
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid(AppError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST)]
    #[case::unauthorized(AppError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED)]
    #[case::not_found(AppError::NotFound("account 1".into()), StatusCode::NOT_FOUND)]
    #[case::store_validation(
        StoreError::Validation("amount must be positive".into()).into(),
        StatusCode::BAD_REQUEST
    )]
    #[case::store_not_found(StoreError::not_found("account 7").into(), StatusCode::NOT_FOUND)]
    #[case::unique(
        StoreError::persistence(ConstraintKind::UniqueViolation, "dup").into(),
        StatusCode::FORBIDDEN
    )]
    #[case::foreign_key(
        StoreError::persistence(ConstraintKind::ForeignKeyViolation, "fk").into(),
        StatusCode::FORBIDDEN
    )]
    #[case::check(
        StoreError::persistence(ConstraintKind::CheckViolation, "check").into(),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case::transaction(
        StoreError::Transaction("deadlock".into()).into(),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case::internal(AppError::Internal("hash".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_status(#[case] err: AppError, #[case] expected: StatusCode) {
        assert_eq!(err.into_response().status(), expected);
    }
}
