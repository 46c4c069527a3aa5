//! Transfer service - request checks in front of the transfer engine.
//!
//! The engine only rejects malformed amounts and ids. This layer adds what
//! depends on who is asking: both accounts must exist and hold the requested
//! currency, and the caller must own the source account.

use crate::{
    error::AppError,
    models::{
        account::{Account, Currency},
        transfer::{CreateTransferRequest, TransferTxParams, TransferTxResult},
    },
    services::token::Payload,
    store::{Store, StoreError},
};

/// Execute a transfer on behalf of the authenticated user.
///
/// # Process
///
/// 1. Validate ids, amount and currency code
/// 2. Load both accounts and check their currency
/// 3. Check the caller owns the source account
/// 4. Run the transfer as one store transaction
///
/// # Errors
///
/// - `InvalidRequest`: malformed request, same account on both sides, or a
///   currency mismatch
/// - `NotFound`: either account does not exist
/// - `Unauthorized`: the source account belongs to someone else
/// - `Store`: the transfer transaction failed
pub async fn execute_transfer(
    store: &dyn Store,
    caller: &Payload,
    req: CreateTransferRequest,
) -> Result<TransferTxResult, AppError> {
    if req.from_account_id <= 0 || req.to_account_id <= 0 {
        return Err(AppError::InvalidRequest(
            "account ids must be positive".to_string(),
        ));
    }
    if req.amount <= 0 {
        return Err(AppError::InvalidRequest(
            "amount must be positive".to_string(),
        ));
    }
    if req.from_account_id == req.to_account_id {
        return Err(AppError::InvalidRequest(
            "cannot transfer to the same account".to_string(),
        ));
    }
    let currency = req
        .currency
        .parse::<Currency>()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let from_account = valid_account(store, req.from_account_id, currency).await?;
    if from_account.owner != caller.username {
        return Err(AppError::Unauthorized(
            "from account doesn't belong to the authenticated user".to_string(),
        ));
    }
    valid_account(store, req.to_account_id, currency).await?;

    let result = store
        .transfer_tx(TransferTxParams {
            from_account_id: req.from_account_id,
            to_account_id: req.to_account_id,
            amount: req.amount,
        })
        .await?;

    Ok(result)
}

async fn valid_account(
    store: &dyn Store,
    account_id: i64,
    currency: Currency,
) -> Result<Account, AppError> {
    let account = store.get_account(account_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound(format!("account {account_id}")),
        other => AppError::Store(other),
    })?;

    if account.currency != currency {
        return Err(AppError::InvalidRequest(format!(
            "account [{account_id}] currency mismatch: {} vs {currency}",
            account.currency
        )));
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{account::CreateAccountParams, user::CreateUserParams};
    use crate::store::{MemoryStore, Querier};
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn caller(username: &str) -> Payload {
        Payload {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at: Utc::now(),
            expired_at: Utc::now(),
        }
    }

    async fn account(
        store: &MemoryStore,
        owner: &str,
        currency: Currency,
        balance: i64,
    ) -> Account {
        if store.get_user(owner).await.is_err() {
            store
                .create_user(CreateUserParams {
                    username: owner.to_string(),
                    hashed_password: "x".to_string(),
                    full_name: owner.to_string(),
                    email: format!("{owner}@example.com"),
                })
                .await
                .unwrap();
        }
        store
            .create_account(CreateAccountParams {
                owner: owner.to_string(),
                currency,
                balance,
            })
            .await
            .unwrap()
    }

    fn request(from: i64, to: i64, amount: i64, currency: &str) -> CreateTransferRequest {
        CreateTransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount,
            currency: currency.to_string(),
        }
    }

    #[tokio::test]
    async fn transfers_between_matching_accounts() {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;
        let b = account(&store, "bob", Currency::Usd, 0).await;

        let result = execute_transfer(&store, &caller("alice"), request(a.id, b.id, 40, "USD"))
            .await
            .unwrap();

        assert_eq!(result.from_account.balance, 60);
        assert_eq!(result.to_account.balance, 40);
    }

    #[rstest]
    #[case::zero_amount(0, "USD")]
    #[case::unsupported_currency(10, "GBP")]
    #[tokio::test]
    async fn rejects_bad_request(#[case] amount: i64, #[case] currency: &str) {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;
        let b = account(&store, "bob", Currency::Usd, 0).await;

        let err = execute_transfer(&store, &caller("alice"), request(a.id, b.id, amount, currency))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn rejects_same_account() {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;

        let err = execute_transfer(&store, &caller("alice"), request(a.id, a.id, 10, "USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn rejects_currency_mismatch() {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;
        let b = account(&store, "bob", Currency::Eur, 0).await;

        let err = execute_transfer(&store, &caller("alice"), request(a.id, b.id, 10, "USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn rejects_missing_account() {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;

        let err = execute_transfer(&store, &caller("alice"), request(a.id, a.id + 100, 10, "USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_transfer_from_someone_elses_account() {
        let store = MemoryStore::new();
        let a = account(&store, "alice", Currency::Usd, 100).await;
        let b = account(&store, "bob", Currency::Usd, 0).await;

        let err = execute_transfer(&store, &caller("bob"), request(a.id, b.id, 10, "USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    }
}
