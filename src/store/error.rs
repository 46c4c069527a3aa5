//! Error taxonomy of the ledger store and transfer engine.
//!
//! Every store implementation reports failures through `StoreError` so the
//! HTTP layer can classify them without knowing which backend produced them.

use sqlx::error::ErrorKind;

/// Which integrity rule a persistence failure tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    Other,
}

/// Errors produced by the ledger store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed input (non-positive amount or ids). Never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Constraint violation or unexpected store error during an insert/update.
    #[error("persistence error ({kind:?}): {message}")]
    Persistence {
        kind: ConstraintKind,
        message: String,
    },

    /// Begin/commit/rollback failed, the connection dropped, or the
    /// transaction lost a lock or serialization conflict. Safe to retry.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A step failed and the rollback that followed failed too.
    #[error("transaction error: {cause}; rollback error: {rollback}")]
    RollbackFailed {
        cause: Box<StoreError>,
        rollback: Box<StoreError>,
    },
}

impl StoreError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        StoreError::NotFound(what.to_string())
    }

    pub fn persistence(kind: ConstraintKind, message: impl Into<String>) -> Self {
        StoreError::Persistence {
            kind,
            message: message.into(),
        }
    }

    /// True for both transaction-level variants.
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            StoreError::Transaction(_) | StoreError::RollbackFailed { .. }
        )
    }
}

// SQLSTATE codes that mean "the transaction lost a race", not "the data is bad".
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::not_found("row"),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                if matches!(
                    code.as_deref(),
                    Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE)
                ) {
                    return StoreError::Transaction(db.message().to_string());
                }
                let kind = match db.kind() {
                    ErrorKind::UniqueViolation => ConstraintKind::UniqueViolation,
                    ErrorKind::ForeignKeyViolation => ConstraintKind::ForeignKeyViolation,
                    ErrorKind::CheckViolation => ConstraintKind::CheckViolation,
                    _ => ConstraintKind::Other,
                };
                StoreError::persistence(kind, db.message())
            }
            err @ (sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed) => StoreError::Transaction(err.to_string()),
            other => StoreError::persistence(ConstraintKind::Other, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn pool_failures_are_transaction_errors() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transaction_error());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_transaction_error());
    }

    #[test]
    fn rollback_failure_reports_both_errors() {
        let err = StoreError::RollbackFailed {
            cause: Box::new(StoreError::not_found("account 9")),
            rollback: Box::new(StoreError::Transaction("connection reset".to_string())),
        };
        assert!(err.is_transaction_error());
        assert_eq!(
            err.to_string(),
            "transaction error: account 9 not found; rollback error: transaction error: connection reset"
        );
    }
}
