//! Order Aggregator
//!
//! Per-status counts across every owner partition. One component, two
//! strategies: a single scatter query when the deployment has the index
//! for it, and a bounded per-owner enumeration when it does not. Both
//! funnel each record through the normalizer and count the same way, so
//! the strategies are interchangeable; picking one is purely a question
//! of store capability and configuration.

use std::sync::Arc;

use shared::OrderStatistics;

use crate::core::config::RepoConfig;
use crate::core::error::RepoResult;
use crate::directory::OwnerDirectory;
use crate::orders::normalize::try_normalize_document;
use crate::orders::scatter_preferred;
use crate::store::{Document, FieldFilter, ListQuery, Partition, PartitionStore};
use crate::utils::fanout;

pub struct OrderAggregator {
    store: Arc<dyn PartitionStore>,
    directory: Arc<dyn OwnerDirectory>,
    config: RepoConfig,
}

impl OrderAggregator {
    pub fn new(
        store: Arc<dyn PartitionStore>,
        directory: Arc<dyn OwnerDirectory>,
        config: RepoConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Count orders by status, optionally restricted by one equality filter.
    ///
    /// The filter is pushed down to the store in both strategies, so the
    /// two can never count different populations.
    pub async fn count_by_status(&self, filter: Option<&FieldFilter>) -> RepoResult<OrderStatistics> {
        if scatter_preferred(self.store.as_ref(), &self.config) {
            match self.count_scattered(filter).await {
                Ok(stats) => return Ok(stats),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "scatter aggregation failed, enumerating partitions instead"
                    );
                }
            }
        }
        self.count_enumerated(filter).await
    }

    async fn count_scattered(&self, filter: Option<&FieldFilter>) -> RepoResult<OrderStatistics> {
        let hits = self.store.scatter(&build_query(filter)).await?;
        let mut stats = OrderStatistics::default();
        for hit in &hits {
            count_document(&mut stats, &hit.doc, &hit.owner_id);
        }
        Ok(stats)
    }

    async fn count_enumerated(&self, filter: Option<&FieldFilter>) -> RepoResult<OrderStatistics> {
        let owners = self.directory.list_owners().await?;
        let query = build_query(filter);
        let store = &self.store;

        let outcome = fanout::gather(
            &self.config,
            owners.into_iter().map(|owner| owner.id).collect(),
            |owner_id| {
                let store = Arc::clone(store);
                let query = query.clone();
                async move {
                    let partition = Partition::OwnerOrders(owner_id.clone());
                    let docs = store.list(&partition, &query).await?;
                    let mut stats = OrderStatistics::default();
                    for doc in &docs {
                        count_document(&mut stats, doc, &owner_id);
                    }
                    Ok(stats)
                }
            },
        )
        .await?;

        if outcome.is_partial() {
            tracing::warn!(
                failed = ?outcome.failed_owner_ids(),
                "statistics computed without unreadable partitions"
            );
        }
        let partial = outcome.is_partial();
        let mut merged = OrderStatistics::default();
        for stats in outcome.items {
            merged.merge(stats);
        }
        merged.partial = partial;
        Ok(merged)
    }
}

fn build_query(filter: Option<&FieldFilter>) -> ListQuery {
    match filter {
        Some(filter) => ListQuery::all().filter(filter.field.clone(), filter.value.clone()),
        None => ListQuery::all(),
    }
}

/// Records that cannot be coerced at all are skipped, never counted
fn count_document(stats: &mut OrderStatistics, doc: &Document, owner_id: &str) {
    match try_normalize_document(doc, owner_id) {
        Ok(order) => stats.record(&order.status),
        Err(err) => {
            tracing::warn!(record_id = %doc.key, error = %err, "skipping uncountable record");
        }
    }
}
