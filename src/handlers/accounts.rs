//! Account management HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /accounts - Create an account for the authenticated user
//! - GET /accounts/{id} - Get account by ID
//! - GET /accounts - List the authenticated user's accounts, paged
//! - DELETE /accounts/{id} - Delete an account with no history
//! - GET /accounts/{id}/entries - List an account's entries, paged
//!
//! Every endpoint acts only on accounts owned by the token's user.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    app::AppState,
    error::AppError,
    models::{
        account::{
            Account, CreateAccountParams, CreateAccountRequest, Currency, ListAccountsParams,
            PageQuery,
        },
        entry::{Entry, ListEntriesParams},
    },
    services::token::Payload,
    store::{Store, StoreError},
};

/// Create a new account.
///
/// # Request Body
///
/// ```json
/// { "currency": "USD" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the created account, balance 0
/// - **Error (400)**: unsupported currency
/// - **Error (403)**: the user already has an account in that currency
pub async fn create_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let currency = request
        .currency
        .parse::<Currency>()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let account = state
        .store
        .create_account(CreateAccountParams {
            owner: caller.username,
            currency,
            balance: 0,
        })
        .await?;

    Ok(Json(account))
}

/// Get a specific account by ID.
///
/// # Response
///
/// - **Success (200 OK)**: account details
/// - **Error (404)**: no such account
/// - **Error (401)**: the account belongs to another user
pub async fn get_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Path(account_id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = owned_account(state.store.as_ref(), &caller, account_id).await?;
    Ok(Json(account))
}

/// List the authenticated user's accounts ordered by id.
///
/// # Query Parameters
///
/// - `page_id` - 1-based page number
/// - `page_size` - between 5 and 10
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Account>>, AppError> {
    let (limit, offset) = page.limit_offset().map_err(AppError::InvalidRequest)?;

    let accounts = state
        .store
        .list_accounts(ListAccountsParams {
            owner: caller.username,
            limit,
            offset,
        })
        .await?;

    Ok(Json(accounts))
}

/// Delete an account.
///
/// Waits for transfers in flight on the account. Accounts that already have
/// entries or transfers cannot be deleted (403).
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Path(account_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    owned_account(state.store.as_ref(), &caller, account_id).await?;

    state.store.delete_account(account_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound(format!("account {account_id}")),
        other => AppError::Store(other),
    })?;

    tracing::info!(account_id, owner = %caller.username, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List an account's entries ordered by id.
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(caller): Extension<Payload>,
    Path(account_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Entry>>, AppError> {
    let (limit, offset) = page.limit_offset().map_err(AppError::InvalidRequest)?;
    owned_account(state.store.as_ref(), &caller, account_id).await?;

    let entries = state
        .store
        .list_entries(ListEntriesParams {
            account_id,
            limit,
            offset,
        })
        .await?;

    Ok(Json(entries))
}

async fn owned_account(
    store: &dyn Store,
    caller: &Payload,
    account_id: i64,
) -> Result<Account, AppError> {
    if account_id < 1 {
        return Err(AppError::InvalidRequest(
            "account id must be positive".to_string(),
        ));
    }

    let account = store.get_account(account_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound(format!("account {account_id}")),
        other => AppError::Store(other),
    })?;

    if account.owner != caller.username {
        return Err(AppError::Unauthorized(
            "account doesn't belong to the authenticated user".to_string(),
        ));
    }
    Ok(account)
}
