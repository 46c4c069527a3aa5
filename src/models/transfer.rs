//! Transfer data models and API request types.
//!
//! This module defines:
//! - `Transfer`: Database entity for a completed money movement
//! - `TransferTxParams` / `TransferTxResult`: Input and output of the transfer engine
//! - `CreateTransferRequest`: Request body accepted by `POST /transfers`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{account::Account, entry::Entry};

/// Represents a transfer record from the database.
///
/// # Database Table
///
/// Maps to the `transfers` table. A row is only ever written inside the
/// transfer transaction together with its two entries and balance updates,
/// and is never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Transfer {
    pub id: i64,

    /// Account the money left
    pub from_account_id: i64,

    /// Account the money arrived in
    pub to_account_id: i64,

    /// Amount moved in minor units
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// Arguments for inserting a transfer row.
#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Arguments for paging through transfers between two accounts.
#[derive(Debug, Clone, Copy)]
pub struct ListTransfersParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Input of the transfer engine.
///
/// Currency agreement between the two accounts is the caller's concern;
/// the engine only checks that ids and amount are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Everything written by one committed transfer.
///
/// `from_account` and `to_account` carry the balances after the transfer.
///
/// # JSON Example
///
/// ```json
/// {
///   "transfer": {
///     "id": 7, "from_account_id": 1, "to_account_id": 2, "amount": 30, "created_at": "..."
///   },
///   "from_account": {
///     "id": 1, "owner": "alice", "balance": 70, "currency": "USD", "created_at": "..."
///   },
///   "to_account": {
///     "id": 2, "owner": "bob", "balance": 80, "currency": "USD", "created_at": "..."
///   },
///   "from_entry": { "id": 13, "account_id": 1, "amount": -30, "created_at": "..." },
///   "to_entry": { "id": 14, "account_id": 2, "amount": 30, "created_at": "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Request to transfer money between accounts.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": 1,
///   "to_account_id": 2,
///   "amount": 2500,
///   "currency": "USD"
/// }
/// ```
///
/// # Validation
///
/// - Both ids must be positive and different
/// - Amount must be positive
/// - Currency must be supported and match both accounts
/// - The source account must belong to the authenticated user
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}
