//! Reconciliation layer configuration

use std::time::Duration;

use crate::utils::fanout::FanOutPolicy;

/// Tunables for cross-partition reads.
///
/// # Environment Variables
///
/// | Variable             | Default       | Meaning                                     |
/// |----------------------|---------------|---------------------------------------------|
/// | `FANOUT_LIMIT`       | `8`           | Max concurrent per-owner partition visits    |
/// | `REQUEST_TIMEOUT_MS` | `10000`       | Per-partition read timeout in milliseconds   |
/// | `FANOUT_POLICY`      | `best-effort` | `best-effort` or `fail-fast`                 |
/// | `PREFER_SCATTER`     | `true`        | Use scatter queries when the store has them  |
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Max in-flight partition visits during a fan-out
    pub fanout_limit: usize,
    /// Per-partition read timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// What one failed partition does to the whole operation
    pub fanout_policy: FanOutPolicy,
    /// Prefer one scatter query over per-owner enumeration when available
    pub prefer_scatter: bool,
}

impl RepoConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            fanout_limit: std::env::var("FANOUT_LIMIT")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|limit: &usize| *limit > 0)
                .unwrap_or(8),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
            fanout_policy: std::env::var("FANOUT_POLICY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            prefer_scatter: std::env::var("PREFER_SCATTER")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(true),
        }
    }

    /// Override the fan-out knobs (used by tests)
    pub fn with_overrides(
        fanout_limit: usize,
        request_timeout_ms: u64,
        fanout_policy: FanOutPolicy,
    ) -> Self {
        let mut config = Self::from_env();
        config.fanout_limit = fanout_limit.max(1);
        config.request_timeout_ms = request_timeout_ms;
        config.fanout_policy = fanout_policy;
        config
    }

    /// Per-partition visit timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
