//! Transfer HTTP handlers.
//!
//! - POST /transfers - Move money between two accounts
//! - GET /transfers/{id} - Get transfer details

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    app::AppState,
    error::AppError,
    models::transfer::{CreateTransferRequest, Transfer, TransferTxResult},
    services::{token::Payload, transfer_service},
    store::StoreError,
};

/// Transfer money between two accounts.
///
/// # Request Body
///
/// ```json
/// {
///   "from_account_id": 1,
///   "to_account_id": 2,
///   "amount": 1500,
///   "currency": "USD"
/// }
/// ```
///
/// # Response (200)
///
/// The transfer record, both entries and both updated accounts:
///
/// ```json
/// {
///   "transfer": { "id": 7, "from_account_id": 1, "to_account_id": 2, "amount": 1500, ... },
///   "from_account": { "id": 1, "balance": 8500, ... },
///   "to_account": { "id": 2, "balance": 1500, ... },
///   "from_entry": { "id": 13, "account_id": 1, "amount": -1500, ... },
///   "to_entry": { "id": 14, "account_id": 2, "amount": 1500, ... }
/// }
/// ```
pub async fn create_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<TransferTxResult>, AppError> {
    let result = transfer_service::execute_transfer(state.store.as_ref(), &caller, request).await?;
    Ok(Json(result))
}

/// Get a transfer by ID.
///
/// The caller must own the source or the destination account.
pub async fn get_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Path(transfer_id): Path<i64>,
) -> Result<Json<Transfer>, AppError> {
    let transfer = state
        .store
        .get_transfer(transfer_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => AppError::NotFound(format!("transfer {transfer_id}")),
            other => AppError::Store(other),
        })?;

    let from_account = state.store.get_account(transfer.from_account_id).await?;
    let to_account = state.store.get_account(transfer.to_account_id).await?;
    if from_account.owner != caller.username && to_account.owner != caller.username {
        return Err(AppError::Unauthorized(
            "transfer doesn't involve the authenticated user".to_string(),
        ));
    }

    Ok(Json(transfer))
}
