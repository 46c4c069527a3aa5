//! Ledger store: storage abstraction and the money-transfer engine.
//!
//! # Layout
//!
//! - `Querier`: single-statement reads and inserts used by the HTTP layer
//! - `Ledger` / `LedgerTx`: opening a transaction and the statements that run
//!   inside one (transfer insert, entry insert, atomic balance delta)
//! - `tx::exec_tx`: begin / run / commit-or-rollback boundary
//! - `transfer::transfer_tx`: the transfer orchestrator
//! - `Store`: object-safe facade (`Querier` + `transfer_tx`) injected into
//!   handlers as `Arc<dyn Store>`
//!
//! Two backends implement the traits: `postgres::SqlStore` and
//! `memory::MemoryStore`.
//!
//! # Atomicity Guarantees
//!
//! A transfer's five writes happen inside one `LedgerTx`. Nothing becomes
//! visible to other transactions until `commit`, and dropping a `LedgerTx`
//! without committing discards everything it wrote.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod transfer;
pub mod tx;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    account::{Account, CreateAccountParams, ListAccountsParams},
    entry::{CreateEntryParams, Entry, ListEntriesParams},
    session::{CreateSessionParams, Session},
    transfer::{
        CreateTransferParams, ListTransfersParams, Transfer, TransferTxParams, TransferTxResult,
    },
    user::{CreateUserParams, User},
};

pub use error::{ConstraintKind, StoreError};
pub use memory::MemoryStore;
pub use postgres::SqlStore;

/// Statements that run inside an open transaction.
///
/// Implementations must hold a row lock on every account passed to
/// `add_account_balance` until `commit` or `rollback`, and must discard all
/// writes if the value is dropped without `commit`.
#[async_trait]
pub trait LedgerTx: Send {
    async fn create_transfer(&mut self, arg: CreateTransferParams) -> Result<Transfer, StoreError>;

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, StoreError>;

    /// Atomically add `amount` (signed) to the account balance and return the
    /// updated row. The increment is evaluated by the store, never as a
    /// read-then-write from the caller.
    async fn add_account_balance(
        &mut self,
        account_id: i64,
        amount: i64,
    ) -> Result<Account, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// A store that can open transactions.
#[async_trait]
pub trait Ledger: Send + Sync {
    type Tx: LedgerTx + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Non-transactional queries.
///
/// Getters return `StoreError::NotFound` when the row is missing.
#[async_trait]
pub trait Querier: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_user(&self, arg: CreateUserParams) -> Result<User, StoreError>;
    async fn get_user(&self, username: &str) -> Result<User, StoreError>;

    async fn create_session(&self, arg: CreateSessionParams) -> Result<Session, StoreError>;
    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError>;

    async fn create_account(&self, arg: CreateAccountParams) -> Result<Account, StoreError>;
    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;
    /// Accounts of one owner ordered by id.
    async fn list_accounts(&self, arg: ListAccountsParams) -> Result<Vec<Account>, StoreError>;
    /// Waits for in-flight transfers on the account; fails with a foreign-key
    /// violation while entries or transfers still reference it.
    async fn delete_account(&self, id: i64) -> Result<(), StoreError>;

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError>;
    /// Entries of one account ordered by id.
    async fn list_entries(&self, arg: ListEntriesParams) -> Result<Vec<Entry>, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError>;
    /// Transfers leaving `from_account_id` or arriving at `to_account_id`, ordered by id.
    async fn list_transfers(&self, arg: ListTransfersParams) -> Result<Vec<Transfer>, StoreError>;
}

/// Everything the service layer needs from storage.
#[async_trait]
pub trait Store: Querier {
    /// Move `amount` between two accounts as one atomic unit.
    async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError>;
}

#[async_trait]
impl<L> Store for L
where
    L: Querier + Ledger,
{
    async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        transfer::transfer_tx(self, arg).await
    }
}
