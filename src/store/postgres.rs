//! PostgreSQL-backed ledger store.
//!
//! All balance updates happen within PostgreSQL transactions. Row locks are
//! taken by the `UPDATE ... SET balance = balance + $1` statement itself and
//! held until commit or rollback. A `SqlTx` dropped without commit is rolled
//! back by sqlx when its connection returns to the pool.

use async_trait::async_trait;
use sqlx::Postgres;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{
    account::{Account, CreateAccountParams, ListAccountsParams},
    entry::{CreateEntryParams, Entry, ListEntriesParams},
    session::{CreateSessionParams, Session},
    transfer::{CreateTransferParams, ListTransfersParams, Transfer},
    user::{CreateUserParams, User},
};

use super::{Ledger, LedgerTx, Querier, StoreError};

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";
const USER_COLUMNS: &str =
    "username, hashed_password, full_name, email, password_changed_at, created_at";
const SESSION_COLUMNS: &str =
    "id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at, created_at";

/// Ledger store over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// An open PostgreSQL transaction.
pub struct SqlTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn transaction_error(err: sqlx::Error) -> StoreError {
    StoreError::Transaction(err.to_string())
}

#[async_trait]
impl Ledger for SqlStore {
    type Tx = SqlTx;

    async fn begin(&self) -> Result<SqlTx, StoreError> {
        let tx = self.pool.begin().await.map_err(transaction_error)?;
        Ok(SqlTx { tx })
    }
}

#[async_trait]
impl LedgerTx for SqlTx {
    async fn create_transfer(&mut self, arg: CreateTransferParams) -> Result<Transfer, StoreError> {
        let transfer = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(arg.from_account_id)
        .bind(arg.to_account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(transfer)
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, StoreError> {
        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(arg.account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        account_id: i64,
        amount: i64,
    ) -> Result<Account, StoreError> {
        // The increment is evaluated server-side under the row lock
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + $1
            WHERE id = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(amount)
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("account {account_id}")))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(transaction_error)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(transaction_error)
    }
}

#[async_trait]
impl Querier for SqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(transaction_error)?;
        Ok(())
    }

    async fn create_user(&self, arg: CreateUserParams) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, hashed_password, full_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(arg.username)
        .bind(arg.hashed_password)
        .bind(arg.full_name)
        .bind(arg.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("user {username}")))
    }

    async fn create_session(&self, arg: CreateSessionParams) -> Result<Session, StoreError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions
                (id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(arg.id)
        .bind(arg.username)
        .bind(arg.refresh_token)
        .bind(arg.user_agent)
        .bind(arg.client_ip)
        .bind(arg.is_blocked)
        .bind(arg.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError> {
        sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("session {id}")))
    }

    async fn create_account(&self, arg: CreateAccountParams) -> Result<Account, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(arg.owner)
        .bind(arg.balance)
        .bind(arg.currency.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("account {id}")))
    }

    async fn list_accounts(&self, arg: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE owner = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(arg.owner)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn delete_account(&self, id: i64) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::not_found(format!("account {id}")));
        }
        Ok(())
    }

    async fn get_entry(&self, id: i64) -> Result<Entry, StoreError> {
        sqlx::query_as::<_, Entry>(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("entry {id}")))
    }

    async fn list_entries(&self, arg: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let entries = sqlx::query_as::<_, Entry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE account_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(arg.account_id)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("transfer {id}")))
    }

    async fn list_transfers(&self, arg: ListTransfersParams) -> Result<Vec<Transfer>, StoreError> {
        let transfers = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE from_account_id = $1 OR to_account_id = $2
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(arg.from_account_id)
        .bind(arg.to_account_id)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}
