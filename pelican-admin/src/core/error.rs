//! Repository error taxonomy
//!
//! Callers need to tell "the order is not there" apart from "we could not
//! look everywhere", so absence and degraded reads are distinct variants.

use thiserror::Error;

use shared::OpResult;

use crate::store::StoreError;

/// Errors surfaced by the reconciliation layer
#[derive(Debug, Error)]
pub enum RepoError {
    /// The order (or owner) does not exist in any tier we are allowed to
    /// assert about. Expected outcome, not a fault.
    #[error("not found: {0}")]
    NotFound(String),

    /// A cross-partition sweep could not complete, so absence cannot be
    /// proven. Carries which partitions were unreadable.
    #[error("partition scan failed: {0}")]
    PartitionScan(String),

    /// A stored record too malformed to coerce into the canonical shape
    /// (normalization itself is total for any object; this is reserved for
    /// documents that are not objects at all)
    #[error("cannot normalize record {record_id}: {reason}")]
    Normalization { record_id: String, reason: String },

    /// Fan-out aborted under the fail-fast policy
    #[error("aggregation failed for {} partition(s): {}", failed.len(), failed.join(", "))]
    PartialAggregation { failed: Vec<String> },

    /// Rejected request payload (oversized text, out-of-range amount, ...)
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The store rejected a write
    #[error("write failed: {0}")]
    Write(#[source] StoreError),

    /// Store failure during a read
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound(_))
    }
}

/// Convert an operation result into the UI envelope.
///
/// `NotFound` is an expected outcome and becomes a `success = false`
/// envelope; every other error keeps propagating to the caller.
pub fn into_envelope<T>(result: RepoResult<T>) -> RepoResult<OpResult<T>> {
    match result {
        Ok(data) => Ok(OpResult::ok(data)),
        Err(err) if err.is_not_found() => Ok(OpResult::not_found(err.to_string())),
        Err(err) => Err(err),
    }
}
