//! Shared types for the Pelican admin panel
//!
//! Canonical data models, the operation result envelope, and small
//! utility helpers used by the admin crates.

pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    Coordinates, Order, OrderItem, OrderStatistics, OrderStatus, OrderWithOwner, Owner,
};
pub use response::OpResult;
