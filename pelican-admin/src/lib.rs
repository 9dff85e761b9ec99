//! Pelican Admin - Order Reconciliation Layer
//!
//! Data-access layer for the restaurant admin panel. Orders live in
//! per-owner partitions of a document store, written by several
//! generations of clients that never agreed on field names, plus a flat
//! legacy collection from before partitioning. This crate reconciles all
//! of that behind one repository facade: every read funnels through a
//! normalizer into a single canonical shape, and every cross-partition
//! operation picks between one scatter query and a bounded per-owner
//! fan-out depending on what the deployment supports.
//!
//! # Module Structure
//!
//! ```text
//! pelican-admin/src/
//! ├── lib.rs           # Library entry, re-exports
//! ├── core/            # Configuration and error taxonomy
//! │   ├── config.rs    # RepoConfig (fan-out limits, timeouts, policy)
//! │   └── error.rs     # RepoError, result envelope conversion
//! ├── store/           # Partition store port
//! │   ├── mod.rs       # PartitionStore trait, partitions, queries
//! │   └── memory.rs    # In-memory backend for tests and development
//! ├── directory.rs     # Owner roster lookup
//! ├── orders/          # Order domain
//! │   ├── normalize.rs # Raw record -> canonical Order
//! │   ├── locator.rs   # Tiered (owner?, order id) -> partition lookup
//! │   ├── stats.rs     # Per-status aggregation, two strategies
//! │   ├── repository.rs# CRUD / listing / transition facade
//! │   └── money.rs     # 2-dp line total arithmetic
//! └── utils/           # Infrastructure
//!     ├── fanout.rs    # Bounded concurrent partition visits
//!     ├── logger.rs    # Tracing setup (console + rolling file)
//!     └── validation.rs# Payload text/amount limits
//! ```

pub mod core;
pub mod directory;
pub mod orders;
pub mod store;
pub mod utils;

// Re-export main types
pub use crate::core::config::RepoConfig;
pub use crate::core::error::{RepoError, RepoResult, into_envelope};
pub use crate::directory::{OwnerDirectory, StoreDirectory};
pub use crate::orders::{
    Located, OrderAggregator, OrderListing, OrderLocator, OrderPath, OrderRepository,
};
pub use crate::store::{
    Document, FieldFilter, ListQuery, MemoryStore, Partition, PartitionStore, ScatterHit,
    StoreError, StoreResult,
};
pub use crate::utils::fanout::FanOutPolicy;
pub use crate::utils::logger::{init_logger, init_logger_with_file};
