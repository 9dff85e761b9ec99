//! Order domain
//!
//! Orders sit in per-owner partitions with a flat legacy collection behind
//! them, written by years of clients that never agreed on field names.
//! This module reconciles all of that behind one facade:
//!
//! - [`normalize`]: raw record -> canonical [`shared::Order`], total and
//!   idempotent
//! - [`locator`]: `(owner id?, order id)` -> the partition actually holding
//!   the order, tier by tier
//! - [`stats`]: per-status counts, one scatter query or a bounded fan-out
//! - [`repository`]: the create/read/update/delete/list/transition facade
//! - [`money`]: 2-dp line total arithmetic
//!
//! # Lookup Tiers
//!
//! ```text
//! owner known ───► direct read ───► hit? done
//!                       │ miss
//! owner unknown ──► scatter query ──► unavailable or failing?
//!                       │ hit? done          │
//!                       │ miss               ▼
//!                       │          per-owner probing (bounded fan-out)
//!                       ▼                    │ miss
//!                legacy collection ◄─────────┘
//!                       │ miss
//!                       ▼
//!                    NotFound
//! ```

pub mod locator;
pub mod money;
pub mod normalize;
pub mod repository;
pub mod stats;

pub use locator::{Located, OrderLocator, OrderPath};
pub use repository::{OrderListing, OrderRepository};
pub use stats::OrderAggregator;

use crate::core::config::RepoConfig;
use crate::store::PartitionStore;

/// The one strategy switch for cross-partition reads: scatter only when the
/// deployment supports it and configuration has not turned it off.
pub(crate) fn scatter_preferred(store: &dyn PartitionStore, config: &RepoConfig) -> bool {
    config.prefer_scatter && store.supports_scatter()
}
