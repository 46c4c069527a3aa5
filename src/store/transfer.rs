//! Transfer engine - moves money between two accounts atomically.
//!
//! One transfer writes, inside a single transaction:
//! 1. A `transfers` row
//! 2. A debit entry (`-amount`) on the source account
//! 3. A credit entry (`+amount`) on the destination account
//! 4. Both balance updates
//!
//! # Lock Ordering
//!
//! Balance updates lock account rows. They are always applied to the account
//! with the lower id first, whichever side of the transfer it is on, so two
//! transfers A→B and B→A queue on the same row instead of each holding one
//! lock and waiting for the other.

use crate::models::{
    account::Account,
    entry::CreateEntryParams,
    transfer::{CreateTransferParams, TransferTxParams, TransferTxResult},
};

use super::{Ledger, LedgerTx, StoreError, tx::exec_tx};

/// Execute a transfer as one atomic unit.
///
/// # Errors
///
/// - `Validation`: an id or the amount is not positive (no transaction is opened)
/// - `NotFound`: an account vanished before its balance could be updated
/// - `Persistence`: an insert or update violated a constraint
/// - `Transaction` / `RollbackFailed`: the transaction itself failed
///
/// Whatever the error, nothing from the attempt is left behind.
pub async fn transfer_tx<L>(
    ledger: &L,
    arg: TransferTxParams,
) -> Result<TransferTxResult, StoreError>
where
    L: Ledger,
{
    validate(&arg)?;

    let result = exec_tx(ledger, move |tx: &mut L::Tx| {
        Box::pin(async move {
            let transfer = tx
                .create_transfer(CreateTransferParams {
                    from_account_id: arg.from_account_id,
                    to_account_id: arg.to_account_id,
                    amount: arg.amount,
                })
                .await?;

            let from_entry = tx
                .create_entry(CreateEntryParams {
                    account_id: arg.from_account_id,
                    amount: -arg.amount,
                })
                .await?;

            let to_entry = tx
                .create_entry(CreateEntryParams {
                    account_id: arg.to_account_id,
                    amount: arg.amount,
                })
                .await?;

            let (from_account, mut to_account) = if arg.from_account_id < arg.to_account_id {
                add_money(
                    tx,
                    arg.from_account_id,
                    -arg.amount,
                    arg.to_account_id,
                    arg.amount,
                )
                .await?
            } else {
                let (to_account, from_account) = add_money(
                    tx,
                    arg.to_account_id,
                    arg.amount,
                    arg.from_account_id,
                    -arg.amount,
                )
                .await?;
                (from_account, to_account)
            };
            // Both updates hit one row; report its final balance on both sides
            if arg.from_account_id == arg.to_account_id {
                to_account = from_account.clone();
            }

            Ok::<_, StoreError>(TransferTxResult {
                transfer,
                from_account,
                to_account,
                from_entry,
                to_entry,
            })
        })
    })
    .await;

    match &result {
        Ok(res) => tracing::info!(
            transfer_id = res.transfer.id,
            from_account_id = arg.from_account_id,
            to_account_id = arg.to_account_id,
            amount = arg.amount,
            "transfer committed"
        ),
        Err(e) => tracing::warn!(
            from_account_id = arg.from_account_id,
            to_account_id = arg.to_account_id,
            amount = arg.amount,
            error = %e,
            "transfer aborted"
        ),
    }

    result
}

/// Apply two balance deltas in the order given.
///
/// Callers pass the lower account id first. Returns the updated accounts in
/// the same order.
pub async fn add_money<T>(
    tx: &mut T,
    account_id1: i64,
    amount1: i64,
    account_id2: i64,
    amount2: i64,
) -> Result<(Account, Account), StoreError>
where
    T: LedgerTx,
{
    let account1 = tx.add_account_balance(account_id1, amount1).await?;
    let account2 = tx.add_account_balance(account_id2, amount2).await?;
    Ok((account1, account2))
}

fn validate(arg: &TransferTxParams) -> Result<(), StoreError> {
    if arg.from_account_id <= 0 || arg.to_account_id <= 0 {
        return Err(StoreError::Validation(
            "account ids must be positive".to_string(),
        ));
    }
    if arg.amount <= 0 {
        return Err(StoreError::Validation("amount must be positive".to_string()));
    }
    Ok(())
}
