//! Transactional execution boundary.

use futures::future::BoxFuture;

use super::{Ledger, LedgerTx, StoreError};

/// Run `f` inside one store transaction.
///
/// # Process
///
/// 1. Begin a transaction
/// 2. Run `f` against it
/// 3. Commit if `f` succeeded, otherwise roll back
///
/// # Errors
///
/// - Whatever `f` returned, after a successful rollback
/// - `StoreError::RollbackFailed` carrying both errors when the rollback
///   itself fails
/// - `StoreError::Transaction` when begin or commit fails
///
/// # Cancellation
///
/// If the returned future is dropped before commit, the open `LedgerTx` is
/// dropped with it and its writes are discarded.
pub async fn exec_tx<L, Tx, T, F>(ledger: &L, f: F) -> Result<T, StoreError>
where
    L: Ledger<Tx = Tx>,
    Tx: LedgerTx + 'static,
    T: Send,
    F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<T, StoreError>> + Send,
{
    let mut tx = ledger.begin().await?;

    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(cause) => match tx.rollback().await {
            Ok(()) => Err(cause),
            Err(rollback) => {
                tracing::error!(error = %cause, rollback_error = %rollback, "rollback failed");
                Err(StoreError::RollbackFailed {
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                })
            }
        },
    }
}
