//! Data models
//!
//! Canonical shapes shared between the admin crate and the frontend (via API).
//! Monetary amounts are `f64` in currency units; timestamps are UTC.

pub mod order;
pub mod owner;

// Re-exports
pub use order::*;
pub use owner::*;
