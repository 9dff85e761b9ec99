//! Bounded fan-out over owner partitions
//!
//! The enumeration fallbacks (locate, list-all, statistics) visit one
//! partition per owner. Visits run concurrently through a bounded window,
//! each under its own timeout. What one failed partition does to the whole
//! operation is the caller's policy: skip it and annotate the result, or
//! cancel the remaining work and fail.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::core::config::RepoConfig;
use crate::core::error::{RepoError, RepoResult};

/// What a failed partition does to the whole fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutPolicy {
    /// Skip the failed partition, finish the rest, annotate the result
    #[default]
    BestEffort,
    /// First failure cancels in-flight siblings and fails the operation
    FailFast,
}

impl FromStr for FanOutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(FanOutPolicy::BestEffort),
            "fail-fast" => Ok(FanOutPolicy::FailFast),
            other => Err(format!("unknown fan-out policy: {other}")),
        }
    }
}

/// One partition that could not be visited
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    pub owner_id: String,
    pub message: String,
}

/// Fan-out result: per-partition values plus the partitions that failed
#[derive(Debug)]
pub struct GatherOutcome<T> {
    pub items: Vec<T>,
    pub failures: Vec<PartitionFailure>,
}

impl<T> GatherOutcome<T> {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_owner_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.owner_id.clone()).collect()
    }
}

enum TaskOutcome<T> {
    Done(T),
    Failed(String),
    Cancelled,
}

/// Visit every owner partition concurrently and collect the results.
///
/// At most `config.fanout_limit` visits are in flight at once, each bounded
/// by `config.request_timeout_ms`. Under [`FanOutPolicy::FailFast`] the
/// first failure cancels the in-flight siblings and the call returns
/// [`RepoError::PartialAggregation`] naming only the partitions that
/// actually failed; cancelled siblings are not reported as failures.
pub async fn gather<T, F, Fut>(
    config: &RepoConfig,
    owner_ids: Vec<String>,
    visit: F,
) -> RepoResult<GatherOutcome<T>>
where
    T: Send,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = RepoResult<T>> + Send,
{
    let started = shared::util::now_millis();
    let total = owner_ids.len();
    let token = CancellationToken::new();
    let timeout = config.timeout();
    let visit = &visit;

    let mut results = stream::iter(owner_ids)
        .map(|owner_id| {
            let token = token.clone();
            async move {
                let outcome = run_one(visit, &owner_id, timeout, &token).await;
                (owner_id, outcome)
            }
        })
        .buffer_unordered(config.fanout_limit.max(1));

    let mut items = Vec::new();
    let mut failures = Vec::new();

    while let Some((owner_id, outcome)) = results.next().await {
        match outcome {
            TaskOutcome::Done(value) => items.push(value),
            TaskOutcome::Cancelled => {}
            TaskOutcome::Failed(message) => {
                tracing::error!(owner_id = %owner_id, error = %message, "partition visit failed");
                failures.push(PartitionFailure { owner_id, message });
                if config.fanout_policy == FanOutPolicy::FailFast {
                    token.cancel();
                }
            }
        }
    }

    if config.fanout_policy == FanOutPolicy::FailFast && !failures.is_empty() {
        let failed: Vec<String> = failures.into_iter().map(|f| f.owner_id).collect();
        return Err(RepoError::PartialAggregation { failed });
    }

    tracing::debug!(
        partitions = total,
        failed = failures.len(),
        elapsed_ms = shared::util::now_millis() - started,
        "fan-out complete"
    );
    Ok(GatherOutcome { items, failures })
}

/// Probe partitions concurrently and stop at the first hit.
///
/// - `Ok(Some(_))`: found; remaining in-flight probes are dropped.
/// - `Ok(None)`: every partition answered and none had it.
/// - `Err(PartitionScan)`: no hit, but unreadable partitions mean absence
///   could not be proven (under fail-fast, the first failure ends the
///   sweep the same way).
pub async fn first_hit<T, F, Fut>(
    config: &RepoConfig,
    owner_ids: Vec<String>,
    probe: F,
) -> RepoResult<Option<T>>
where
    T: Send,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = RepoResult<Option<T>>> + Send,
{
    let total = owner_ids.len();
    let token = CancellationToken::new();
    let timeout = config.timeout();
    let probe = &probe;

    let mut results = stream::iter(owner_ids)
        .map(|owner_id| {
            let token = token.clone();
            async move {
                let outcome = run_one(probe, &owner_id, timeout, &token).await;
                (owner_id, outcome)
            }
        })
        .buffer_unordered(config.fanout_limit.max(1));

    let mut failures: Vec<String> = Vec::new();

    while let Some((owner_id, outcome)) = results.next().await {
        match outcome {
            TaskOutcome::Done(Some(value)) => return Ok(Some(value)),
            TaskOutcome::Done(None) | TaskOutcome::Cancelled => {}
            TaskOutcome::Failed(message) => {
                tracing::warn!(owner_id = %owner_id, error = %message, "partition probe failed");
                failures.push(owner_id);
                if config.fanout_policy == FanOutPolicy::FailFast {
                    token.cancel();
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(None)
    } else {
        Err(RepoError::PartitionScan(format!(
            "{} of {total} partitions unreadable: {}",
            failures.len(),
            failures.join(", ")
        )))
    }
}

async fn run_one<T, F, Fut>(
    visit: &F,
    owner_id: &str,
    timeout: Duration,
    token: &CancellationToken,
) -> TaskOutcome<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = RepoResult<T>>,
{
    if token.is_cancelled() {
        return TaskOutcome::Cancelled;
    }
    tokio::select! {
        _ = token.cancelled() => TaskOutcome::Cancelled,
        result = tokio::time::timeout(timeout, visit(owner_id.to_string())) => match result {
            Ok(Ok(value)) => TaskOutcome::Done(value),
            Ok(Err(err)) => TaskOutcome::Failed(err.to_string()),
            Err(_) => TaskOutcome::Failed(format!("timed out after {}ms", timeout.as_millis())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn config(policy: FanOutPolicy) -> RepoConfig {
        RepoConfig::with_overrides(2, 1_000, policy)
    }

    fn owners(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_gather_best_effort_skips_failures() {
        let outcome = gather(
            &config(FanOutPolicy::BestEffort),
            owners(&["u1", "u2", "u3", "u4"]),
            |owner_id| async move {
                if owner_id == "u3" {
                    Err(RepoError::PartitionScan("offline".to_string()))
                } else {
                    Ok(owner_id)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.items.len(), 3);
        assert!(outcome.is_partial());
        assert_eq!(outcome.failed_owner_ids(), vec!["u3".to_string()]);
    }

    #[tokio::test]
    async fn test_gather_fail_fast_cancels_siblings() {
        let started = Instant::now();
        let result: RepoResult<GatherOutcome<()>> = gather(
            &config(FanOutPolicy::FailFast),
            owners(&["bad", "slow"]),
            |owner_id| async move {
                if owner_id == "bad" {
                    Err(RepoError::PartitionScan("offline".to_string()))
                } else {
                    // Long enough that only cancellation can finish us early
                    tokio::time::sleep(Duration::from_millis(900)).await;
                    Ok(())
                }
            },
        )
        .await;

        match result {
            Err(RepoError::PartialAggregation { failed }) => {
                // The cancelled sibling is not listed as a failure
                assert_eq!(failed, vec!["bad".to_string()]);
            }
            other => panic!("expected PartialAggregation, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_gather_times_out_slow_visits() {
        let cfg = RepoConfig::with_overrides(2, 20, FanOutPolicy::BestEffort);
        let outcome = gather(&cfg, owners(&["u1", "u2"]), |owner_id| async move {
            if owner_id == "u1" {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(owner_id)
        })
        .await
        .unwrap();

        assert_eq!(outcome.items, vec!["u2".to_string()]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_gather_respects_concurrency_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcome = gather(
            &config(FanOutPolicy::BestEffort),
            owners(&["a", "b", "c", "d", "e", "f"]),
            |owner_id| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(owner_id)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.items.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_first_hit_returns_early() {
        let probes = Arc::new(AtomicUsize::new(0));
        let hit = first_hit(
            &config(FanOutPolicy::BestEffort),
            owners(&["u1", "u2", "u3", "u4"]),
            |owner_id| {
                let probes = Arc::clone(&probes);
                async move {
                    probes.fetch_add(1, Ordering::SeqCst);
                    if owner_id == "u1" {
                        Ok(Some("found".to_string()))
                    } else {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(None)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(hit.as_deref(), Some("found"));
        assert!(probes.load(Ordering::SeqCst) < 4);
    }

    #[tokio::test]
    async fn test_first_hit_clean_miss_is_none() {
        let hit: Option<()> = first_hit(
            &config(FanOutPolicy::BestEffort),
            owners(&["u1", "u2"]),
            |_| async move { Ok(None) },
        )
        .await
        .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_first_hit_degraded_miss_is_an_error() {
        let result: RepoResult<Option<()>> = first_hit(
            &config(FanOutPolicy::BestEffort),
            owners(&["u1", "u2"]),
            |owner_id| async move {
                if owner_id == "u2" {
                    Err(RepoError::PartitionScan("offline".to_string()))
                } else {
                    Ok(None)
                }
            },
        )
        .await;

        match result {
            Err(RepoError::PartitionScan(message)) => {
                assert!(message.contains("u2"));
                assert!(message.contains("1 of 2"));
            }
            other => panic!("expected PartitionScan, got {other:?}"),
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("best-effort".parse(), Ok(FanOutPolicy::BestEffort));
        assert_eq!("fail-fast".parse(), Ok(FanOutPolicy::FailFast));
        assert!("eventually".parse::<FanOutPolicy>().is_err());
    }
}
