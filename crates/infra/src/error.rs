use thiserror::Error;

use carbonledger_core::{AccountId, DomainError};

use crate::event_store::EventStoreError;

/// Error returned by ledger operations.
///
/// Domain failures (`InvalidInput`, `OutOfRange`, `UnknownAccount`, ...) pass
/// through unchanged; storage failures keep their own variant.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),

    #[error("corrupt stream for account {account_id}: {reason}")]
    CorruptStream { account_id: AccountId, reason: String },
}

impl LedgerError {
    /// The domain error behind this failure, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(err) => Some(err),
            _ => None,
        }
    }
}
