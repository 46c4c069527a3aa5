//! Ledger entry model.
//!
//! An entry records one balance-affecting event on one account. Every
//! transfer writes exactly two: a debit on the source and a credit on the
//! destination. Entries are append-only.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents an entry record from the database.
///
/// # Database Table
///
/// Maps to the `entries` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Entry {
    pub id: i64,

    /// Account whose balance this entry affected
    pub account_id: i64,

    /// Signed amount in minor units: negative for a debit, positive for a credit
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// Arguments for inserting an entry.
#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub amount: i64,
}

/// Arguments for paging through one account's entries, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct ListEntriesParams {
    pub account_id: i64,
    pub limit: i64,
    pub offset: i64,
}
