//! Core module - configuration and error taxonomy
//!
//! - [`RepoConfig`] - reconciliation layer knobs (fan-out, timeouts, policy)
//! - [`RepoError`] - everything an operation can fail with

pub mod config;
pub mod error;

pub use config::RepoConfig;
pub use error::{RepoError, RepoResult, into_envelope};
