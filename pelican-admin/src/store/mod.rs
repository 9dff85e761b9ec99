//! Partition store port
//!
//! The document database behind the admin panel, seen through a narrow
//! async interface. Orders live in per-owner partitions, the owner roster
//! is its own collection, and a flat legacy collection holds orders
//! written before partitioning. Scatter queries (one query spanning every
//! owner partition) are an optional capability: some deployments never
//! provisioned the index for them.

pub mod memory;

pub use memory::MemoryStore;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw document payload as stored
pub type RawRecord = Map<String, Value>;

/// Store-level failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("missing index for query: {0}")]
    MissingIndex(String),
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Addressable collections
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Owner roster
    Owners,
    /// One owner's order partition
    OwnerOrders(String),
    /// Flat collection holding orders written before partitioning
    LegacyOrders,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Owners => write!(f, "owners"),
            Partition::OwnerOrders(owner_id) => write!(f, "owners/{owner_id}/orders"),
            Partition::LegacyOrders => write!(f, "orders"),
        }
    }
}

/// A stored document: its key plus whatever shape was written
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Value,
}

impl Document {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self { key: key.into(), data }
    }
}

/// A scatter query hit, tagged with the partition it came from
#[derive(Debug, Clone)]
pub struct ScatterHit {
    pub owner_id: String,
    pub doc: Document,
}

/// Top-level field equality filter
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// List/scatter query: equality filters, optional key pin, optional ordering
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<FieldFilter>,
    /// Restrict to the document with this key (used by scatter lookups)
    pub key: Option<String>,
    pub order_by: Option<(String, SortDirection)>,
}

impl ListQuery {
    /// Everything in the partition
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter::new(field, value));
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), SortDirection::Descending));
        self
    }
}

/// Async port over the partitioned document store
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Read one document by key
    async fn get(&self, partition: &Partition, key: &str) -> StoreResult<Option<Document>>;

    /// List documents in one partition
    async fn list(&self, partition: &Partition, query: &ListQuery) -> StoreResult<Vec<Document>>;

    /// Whether this deployment can query across all owner partitions at once
    fn supports_scatter(&self) -> bool;

    /// Query every owner partition in one round-trip.
    ///
    /// Covers owner partitions only; the legacy collection is its own
    /// direct-key tier. Errors with [`StoreError::MissingIndex`] when the
    /// backing index was never provisioned.
    async fn scatter(&self, query: &ListQuery) -> StoreResult<Vec<ScatterHit>>;

    /// Create or replace a document
    async fn put(&self, partition: &Partition, key: &str, data: Value) -> StoreResult<()>;

    /// Shallow-merge fields into an existing document
    async fn patch(&self, partition: &Partition, key: &str, fields: RawRecord) -> StoreResult<()>;

    /// Delete a document; deleting a missing key is not an error
    async fn remove(&self, partition: &Partition, key: &str) -> StoreResult<()>;
}
