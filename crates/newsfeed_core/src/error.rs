//! Error vocabulary shared by the relational and key-value backends.
//!
//! # Responsibility
//! - Present one error type for every builder, provider and backend.
//! - Keep the two recoverable sentinels (`NotFound`, `DuplicateRecord`)
//!   detectable through any number of caller wrapping layers.
//!
//! # Invariants
//! - The data layer never retries and never logs errors on behalf of callers.
//! - Every backend failure carries the operation name and target entity.

use crate::ctx::CancelReason;
use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Count,
    Get,
    Insert,
    InsertBatch,
    Update,
    Remove,
    KvGet,
    KvSet,
    KvRemove,
    Transaction,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Count => "count",
            Self::Get => "get",
            Self::Insert => "insert",
            Self::InsertBatch => "insert_batch",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::KvGet => "kv_get",
            Self::KvSet => "kv_set",
            Self::KvRemove => "kv_remove",
            Self::Transaction => "transaction",
        }
    }

    /// Whether the operation mutates storage.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::Insert
                | Self::InsertBatch
                | Self::Update
                | Self::Remove
                | Self::KvSet
                | Self::KvRemove
        )
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the data-access layer.
///
/// Only [`StoreError::NotFound`] and [`StoreError::DuplicateRecord`] are meant
/// for control flow. Everything else is opaque and intended for logging.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Zero matching rows or keys.
    #[error("{entity}: record not found")]
    NotFound { entity: String },

    /// Unique-constraint violation on insert.
    #[error("{entity}: record is already present ({detail})")]
    DuplicateRecord { entity: String, detail: String },

    /// A single-row lookup matched more than one row.
    #[error("{entity}: get matched more than one row")]
    MultipleRows { entity: String },

    /// Record metadata does not line up with the record value.
    #[error("{entity}: invalid record shape: {reason}")]
    InvalidRecordShape { entity: String, reason: String },

    /// Statement could not be rendered (bad identifier, empty set clause, ...).
    #[error("failed to build {op} statement for {entity}: {reason}")]
    Build {
        op: Operation,
        entity: String,
        reason: String,
    },

    #[error("failed to {op} {entity}")]
    QueryFailed {
        op: Operation,
        entity: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to {op} {entity}")]
    WriteFailed {
        op: Operation,
        entity: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{op} on {entity} aborted: {reason}")]
    Cancelled {
        op: Operation,
        entity: String,
        reason: CancelReason,
    },

    #[error("failed to (de)serialize {entity}")]
    Serialization {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {stage} transaction")]
    Transaction {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The backend rolled back the enclosing transaction; nothing issued
    /// since it began is kept and no further statement runs on it.
    #[error("{op} on {entity}: enclosing transaction was aborted")]
    TransactionAborted {
        op: Operation,
        entity: String,
        #[source]
        cause: Option<Box<StoreError>>,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn invalid_shape(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecordShape {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub fn build(op: Operation, entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            op,
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(op: Operation, entity: impl Into<String>, reason: CancelReason) -> Self {
        Self::Cancelled {
            op,
            entity: entity.into(),
            reason,
        }
    }

    pub fn transaction_aborted(
        op: Operation,
        entity: impl Into<String>,
        cause: Option<StoreError>,
    ) -> Self {
        Self::TransactionAborted {
            op,
            entity: entity.into(),
            cause: cause.map(Box::new),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateRecord { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, Self::TransactionAborted { .. })
    }
}

/// Returns `true` when `err` or any error in its source chain is
/// [`StoreError::NotFound`].
pub fn is_not_found(err: &(dyn Error + 'static)) -> bool {
    find_store_error(err).is_some_and(StoreError::is_not_found)
}

/// Returns `true` when `err` or any error in its source chain is
/// [`StoreError::DuplicateRecord`].
pub fn is_duplicate(err: &(dyn Error + 'static)) -> bool {
    find_store_error(err).is_some_and(StoreError::is_duplicate)
}

fn find_store_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a StoreError> {
    let mut current = Some(err);
    while let Some(candidate) = current {
        if let Some(store_error) = candidate.downcast_ref::<StoreError>() {
            return Some(store_error);
        }
        current = candidate.source();
    }
    None
}

/// Treats `NotFound` from a multi-row selection as an empty result.
pub trait OrEmpty<T> {
    fn or_empty(self) -> StoreResult<Vec<T>>;
}

impl<T> OrEmpty<T> for StoreResult<Vec<T>> {
    fn or_empty(self) -> StoreResult<Vec<T>> {
        match self {
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }
}
