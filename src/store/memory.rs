//! In-memory ledger store.
//!
//! Mirrors the PostgreSQL schema closely enough to exercise the transfer
//! engine without a database: bigserial-style ids, unique and foreign-key
//! constraints, and row-level locks on accounts.
//!
//! # Concurrency
//!
//! - Committed rows live in one `RwLock<Tables>`. Readers take the read lock
//!   briefly and never wait on in-flight transfers.
//! - Each account has its own `tokio::sync::Mutex` row lock, held by a
//!   `MemoryTx` from its first balance update until it ends. Transfers on
//!   disjoint accounts never wait on each other.
//! - A transaction's writes are staged privately and published under the
//!   table write lock on commit, so readers see all of a transfer or none.

use std::collections::{BTreeMap, HashMap, btree_map};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::models::{
    account::{Account, CreateAccountParams, ListAccountsParams},
    entry::{CreateEntryParams, Entry, ListEntriesParams},
    session::{CreateSessionParams, Session},
    transfer::{CreateTransferParams, ListTransfersParams, Transfer},
    user::{CreateUserParams, User},
};

use super::{ConstraintKind, Ledger, LedgerTx, Querier, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    sessions: HashMap<Uuid, Session>,
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
}

impl Tables {
    fn account_is_referenced(&self, account_id: i64) -> bool {
        self.entries.values().any(|e| e.account_id == account_id)
            || self
                .transfers
                .values()
                .any(|t| t.from_account_id == account_id || t.to_account_id == account_id)
    }

    fn require_account(&self, account_id: i64, table: &str) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account_id) {
            return Ok(());
        }
        Err(StoreError::persistence(
            ConstraintKind::ForeignKeyViolation,
            format!("insert on {table} references missing account {account_id}"),
        ))
    }
}

#[derive(Debug, Default)]
struct Sequences {
    account: AtomicI64,
    entry: AtomicI64,
    transfer: AtomicI64,
}

// Like a bigserial: ids handed out to rolled-back rows are not reused.
fn next_id(counter: &AtomicI64) -> i64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: DashMap<i64, Arc<Mutex<()>>>,
    seq: Sequences,
}

impl Shared {
    async fn lock_row(&self, account_id: i64) -> Result<OwnedMutexGuard<()>, StoreError> {
        let lock = self
            .row_locks
            .get(&account_id)
            .map(|l| Arc::clone(l.value()))
            .ok_or_else(|| StoreError::not_found(format!("account {account_id}")))?;
        Ok(lock.lock_owned().await)
    }
}

/// Ledger store held entirely in process memory.
///
/// Cloning is cheap and clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct LockedRow {
    _guard: OwnedMutexGuard<()>,
    account: Account,
}

/// An open in-memory transaction.
///
/// Dropping it without `commit` releases its row locks and discards its
/// staged rows.
pub struct MemoryTx {
    shared: Arc<Shared>,
    locked: BTreeMap<i64, LockedRow>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
}

#[async_trait]
impl Ledger for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            shared: Arc::clone(&self.shared),
            locked: BTreeMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
        })
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn create_transfer(&mut self, arg: CreateTransferParams) -> Result<Transfer, StoreError> {
        if arg.amount <= 0 {
            return Err(StoreError::persistence(
                ConstraintKind::CheckViolation,
                "transfers.amount must be positive",
            ));
        }
        {
            let tables = self.shared.tables.read().await;
            tables.require_account(arg.from_account_id, "transfers")?;
            tables.require_account(arg.to_account_id, "transfers")?;
        }

        let transfer = Transfer {
            id: next_id(&self.shared.seq.transfer),
            from_account_id: arg.from_account_id,
            to_account_id: arg.to_account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .require_account(arg.account_id, "entries")?;

        let entry = Entry {
            id: next_id(&self.shared.seq.entry),
            account_id: arg.account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        account_id: i64,
        amount: i64,
    ) -> Result<Account, StoreError> {
        let row = match self.locked.entry(account_id) {
            btree_map::Entry::Occupied(row) => row.into_mut(),
            btree_map::Entry::Vacant(slot) => {
                let guard = self.shared.lock_row(account_id).await?;
                // The row may have been deleted while we waited for the lock
                let account = self
                    .shared
                    .tables
                    .read()
                    .await
                    .accounts
                    .get(&account_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("account {account_id}")))?;
                slot.insert(LockedRow {
                    _guard: guard,
                    account,
                })
            }
        };

        row.account.balance = row.account.balance.checked_add(amount).ok_or_else(|| {
            StoreError::persistence(ConstraintKind::Other, "bigint out of range")
        })?;
        Ok(row.account.clone())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx {
            shared,
            locked,
            transfers,
            entries,
        } = self;

        let mut tables = shared.tables.write().await;
        for (id, row) in &locked {
            if let Some(account) = tables.accounts.get_mut(id) {
                account.balance = row.account.balance;
            }
        }
        tables
            .transfers
            .extend(transfers.into_iter().map(|t| (t.id, t)));
        tables.entries.extend(entries.into_iter().map(|e| (e.id, e)));
        drop(tables);

        // Row locks are released only after the new balances are visible
        drop(locked);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn page<T>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.skip(offset).take(limit).collect()
}

#[async_trait]
impl Querier for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, arg: CreateUserParams) -> Result<User, StoreError> {
        let mut tables = self.shared.tables.write().await;
        if tables.users.contains_key(&arg.username) {
            return Err(StoreError::persistence(
                ConstraintKind::UniqueViolation,
                format!("user {} already exists", arg.username),
            ));
        }
        if tables.users.values().any(|u| u.email == arg.email) {
            return Err(StoreError::persistence(
                ConstraintKind::UniqueViolation,
                format!("email {} already registered", arg.email),
            ));
        }

        let user = User {
            username: arg.username,
            hashed_password: arg.hashed_password,
            full_name: arg.full_name,
            email: arg.email,
            password_changed_at: DateTime::<Utc>::UNIX_EPOCH,
            created_at: Utc::now(),
        };
        tables.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("user {username}")))
    }

    async fn create_session(&self, arg: CreateSessionParams) -> Result<Session, StoreError> {
        let mut tables = self.shared.tables.write().await;
        if !tables.users.contains_key(&arg.username) {
            return Err(StoreError::persistence(
                ConstraintKind::ForeignKeyViolation,
                format!("session references missing user {}", arg.username),
            ));
        }
        if tables.sessions.contains_key(&arg.id) {
            return Err(StoreError::persistence(
                ConstraintKind::UniqueViolation,
                format!("session {} already exists", arg.id),
            ));
        }

        let session = Session {
            id: arg.id,
            username: arg.username,
            refresh_token: arg.refresh_token,
            user_agent: arg.user_agent,
            client_ip: arg.client_ip,
            is_blocked: arg.is_blocked,
            expires_at: arg.expires_at,
            created_at: Utc::now(),
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("session {id}")))
    }

    async fn create_account(&self, arg: CreateAccountParams) -> Result<Account, StoreError> {
        let mut tables = self.shared.tables.write().await;
        if !tables.users.contains_key(&arg.owner) {
            return Err(StoreError::persistence(
                ConstraintKind::ForeignKeyViolation,
                format!("account references missing user {}", arg.owner),
            ));
        }
        if tables
            .accounts
            .values()
            .any(|a| a.owner == arg.owner && a.currency == arg.currency)
        {
            return Err(StoreError::persistence(
                ConstraintKind::UniqueViolation,
                format!("{} already has a {} account", arg.owner, arg.currency),
            ));
        }

        let account = Account {
            id: next_id(&self.shared.seq.account),
            owner: arg.owner,
            balance: arg.balance,
            currency: arg.currency,
            created_at: Utc::now(),
        };
        self.shared
            .row_locks
            .insert(account.id, Arc::new(Mutex::new(())));
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("account {id}")))
    }

    async fn list_accounts(&self, arg: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let tables = self.shared.tables.read().await;
        let owned = tables.accounts.values().filter(|a| a.owner == arg.owner);
        Ok(page(owned.cloned(), arg.limit, arg.offset))
    }

    async fn delete_account(&self, id: i64) -> Result<(), StoreError> {
        // Wait for any transfer holding the row
        let _guard = self.shared.lock_row(id).await?;

        let mut tables = self.shared.tables.write().await;
        if !tables.accounts.contains_key(&id) {
            return Err(StoreError::not_found(format!("account {id}")));
        }
        if tables.account_is_referenced(id) {
            return Err(StoreError::persistence(
                ConstraintKind::ForeignKeyViolation,
                format!("account {id} is still referenced by entries or transfers"),
            ));
        }
        tables.accounts.remove(&id);
        self.shared.row_locks.remove(&id);
        Ok(())
    }

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("entry {id}")))
    }

    async fn list_entries(&self, arg: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let tables = self.shared.tables.read().await;
        let rows = tables
            .entries
            .values()
            .filter(|e| e.account_id == arg.account_id);
        Ok(page(rows.cloned(), arg.limit, arg.offset))
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        self.shared
            .tables
            .read()
            .await
            .transfers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("transfer {id}")))
    }

    async fn list_transfers(&self, arg: ListTransfersParams) -> Result<Vec<Transfer>, StoreError> {
        let tables = self.shared.tables.read().await;
        let rows = tables.transfers.values().filter(|t| {
            t.from_account_id == arg.from_account_id || t.to_account_id == arg.to_account_id
        });
        Ok(page(rows.cloned(), arg.limit, arg.offset))
    }
}
