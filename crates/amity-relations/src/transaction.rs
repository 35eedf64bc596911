//! The single place where commit and rollback decisions are made.
//!
//! A transaction body returns either a value to commit or an [`Abort`]
//! saying how to finish. [`in_transaction`] turns that into a [`TxOutcome`]
//! and performs exactly the commit or rollback the outcome names.

use crate::outcome::Violation;
use amity_core::{GraphHandle, IndexError, StoreError};
use thiserror::Error;

/// A failure inside a transaction body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl TxError {
    /// Folds an index failure into a store failure for callers that only
    /// speak `StoreError`.
    pub fn into_store_error(self) -> StoreError {
        match self {
            TxError::Store(e) => e,
            TxError::Index(e) => StoreError::Backend(e.to_string()),
        }
    }
}

/// How a failed body wants its transaction finished.
#[derive(Debug)]
pub enum Abort<T> {
    /// Roll back.
    Fail(TxError),
    /// Neither commit nor roll back; hand the partial value back.
    Abandon(T, TxError),
}

impl<T> From<StoreError> for Abort<T> {
    fn from(e: StoreError) -> Self {
        Abort::Fail(TxError::Store(e))
    }
}

impl<T> From<IndexError> for Abort<T> {
    fn from(e: IndexError) -> Self {
        Abort::Fail(TxError::Index(e))
    }
}

/// What happened to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome<T> {
    /// The body succeeded and the commit went through.
    Committed(T),
    /// A uniqueness constraint was hit, in the body or at commit. Rolled back.
    Violation(Violation, StoreError),
    /// Any other failure. Rolled back.
    Failed(TxError),
    /// The body asked to leave the transaction open. Nothing was finished.
    Abandoned(T, TxError),
}

/// Runs `body` against `handle` and finishes the transaction.
pub fn in_transaction<T>(
    handle: &dyn GraphHandle,
    body: impl FnOnce(&dyn GraphHandle) -> Result<T, Abort<T>>,
) -> TxOutcome<T> {
    match body(handle) {
        Ok(value) => match handle.commit() {
            Ok(()) => TxOutcome::Committed(value),
            Err(e) => {
                handle.rollback();
                failed(TxError::Store(e))
            }
        },
        Err(Abort::Fail(e)) => {
            handle.rollback();
            failed(e)
        }
        Err(Abort::Abandon(value, e)) => TxOutcome::Abandoned(value, e),
    }
}

fn failed<T>(error: TxError) -> TxOutcome<T> {
    match error {
        TxError::Store(e) if e.is_schema_violation() => {
            TxOutcome::Violation(Violation::classify(&e), e)
        }
        other => TxOutcome::Failed(other),
    }
}
