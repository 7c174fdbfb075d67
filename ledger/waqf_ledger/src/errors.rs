//! Ledger error types.
//!
//! Every failure of a ledger operation is a typed [`LedgerError`]; callers
//! branch on the variant to decide between retrying, informing the user, or
//! treating the outcome as a data problem.

use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The expected version token no longer matches the stored document.
    #[error("version conflict on {collection}/{key}")]
    Conflict { collection: String, key: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("waqf {0} not found")]
    NotFound(String),

    #[error("waqf {0} is not a revolving waqf")]
    InvalidWaqfType(String),

    #[error("tranche {0} not found")]
    TrancheNotFound(String),

    #[error("tranche {0} has already been returned")]
    AlreadyReturned(String),

    #[error("tranche {tranche_id} has not matured yet ({days_remaining} days remaining)")]
    NotMatured {
        tranche_id: String,
        days_remaining: i64,
    },

    #[error("waqf {0} was modified concurrently; re-fetch and retry")]
    ConcurrentModification(String),

    #[error("invalid rollover period: {0} months")]
    InvalidRolloverPeriod(u32),

    #[error("malformed waqf document {key}: {reason}")]
    MalformedDocument { key: String, reason: String },

    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    /// Only a lost optimistic-concurrency race is worth retrying, and only
    /// after re-fetching the document.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Stable identifier of the error kind, for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidWaqfType(_) => "invalid_waqf_type",
            Self::TrancheNotFound(_) => "tranche_not_found",
            Self::AlreadyReturned(_) => "already_returned",
            Self::NotMatured { .. } => "not_matured",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::InvalidRolloverPeriod(_) => "invalid_rollover_period",
            Self::MalformedDocument { .. } => "malformed_document",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => Self::ConcurrentModification(key),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
