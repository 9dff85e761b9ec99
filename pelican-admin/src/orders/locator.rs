//! Order Locator
//!
//! Resolves which partition actually holds an order when the caller may
//! only know its id. Tiers, in order: direct read when the owner is known,
//! one scatter query when the store can do that, bounded per-owner probing
//! when it cannot, and finally the flat legacy collection.
//!
//! A miss is only `NotFound` when every tier answered. If partitions were
//! unreadable during the sweep, absence cannot be proven and the result is
//! `PartitionScan` instead.

use std::sync::Arc;

use crate::core::config::RepoConfig;
use crate::core::error::{RepoError, RepoResult};
use crate::directory::OwnerDirectory;
use crate::orders::scatter_preferred;
use crate::store::{Document, ListQuery, Partition, PartitionStore};
use crate::utils::fanout;

/// Where an order document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPath {
    /// Inside an owner's partition
    Partition { owner_id: String },
    /// In the flat legacy collection
    Legacy,
}

impl OrderPath {
    /// Owner the path belongs to, when it has one
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            OrderPath::Partition { owner_id } => Some(owner_id),
            OrderPath::Legacy => None,
        }
    }

    pub(crate) fn partition(&self) -> Partition {
        match self {
            OrderPath::Partition { owner_id } => Partition::OwnerOrders(owner_id.clone()),
            OrderPath::Legacy => Partition::LegacyOrders,
        }
    }
}

/// A located order: its path plus the document found there, so reads do
/// not pay for a second round-trip.
#[derive(Debug, Clone)]
pub struct Located {
    pub path: OrderPath,
    pub doc: Document,
}

pub struct OrderLocator {
    store: Arc<dyn PartitionStore>,
    directory: Arc<dyn OwnerDirectory>,
    config: RepoConfig,
}

impl OrderLocator {
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

    /// Resolve `(owner id?, order id)` to the partition holding the order.
    ///
    /// A claimed owner is a hint, not a constraint: on a direct miss the
    /// cross-partition tiers still run, so an order filed under a different
    /// owner is found rather than reported missing.
    pub async fn locate(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<Located> {
        // 1. Direct read when the caller knows (or thinks it knows) the owner
        if let Some(owner_id) = owner_id {
            let partition = Partition::OwnerOrders(owner_id.to_string());
            if let Some(doc) = self.store.get(&partition, order_id).await? {
                return Ok(Located {
                    path: OrderPath::Partition {
                        owner_id: owner_id.to_string(),
                    },
                    doc,
                });
            }
        }

        // 2. Cross-partition sweep: scatter when available, probing otherwise.
        //    An incomplete sweep is remembered rather than fatal, because the
        //    legacy tier can still answer definitively.
        let sweep_failure = match self.sweep(order_id).await {
            Ok(Some(located)) => return Ok(located),
            Ok(None) => None,
            Err(err @ (RepoError::PartitionScan(_) | RepoError::PartialAggregation { .. })) => {
                Some(err)
            }
            Err(err) => return Err(err),
        };

        // 3. Flat legacy collection, direct key
        if let Some(doc) = self.store.get(&Partition::LegacyOrders, order_id).await? {
            return Ok(Located {
                path: OrderPath::Legacy,
                doc,
            });
        }

        // A miss is only NotFound when every tier answered
        match sweep_failure {
            Some(err) => Err(err),
            None => Err(RepoError::NotFound(format!("order {order_id}"))),
        }
    }

    /// One scatter query when the deployment has it; a failing scatter
    /// demotes to per-owner probing instead of failing the lookup.
    async fn sweep(&self, order_id: &str) -> RepoResult<Option<Located>> {
        if scatter_preferred(self.store.as_ref(), &self.config) {
            let query = ListQuery::all().with_key(order_id);
            match self.store.scatter(&query).await {
                Ok(hits) => {
                    if hits.len() > 1 {
                        tracing::warn!(
                            order_id = %order_id,
                            hits = hits.len(),
                            "order key present in multiple partitions, using the first"
                        );
                    }
                    return Ok(hits.into_iter().next().map(|hit| Located {
                        path: OrderPath::Partition {
                            owner_id: hit.owner_id,
                        },
                        doc: hit.doc,
                    }));
                }
                Err(err) => {
                    tracing::warn!(
                        order_id = %order_id,
                        error = %err,
                        "scatter lookup failed, probing partitions instead"
                    );
                }
            }
        }
        self.probe(order_id).await
    }

    /// Bounded fan-out: read the key out of every owner partition until one
    /// answers with a document.
    async fn probe(&self, order_id: &str) -> RepoResult<Option<Located>> {
        let owners = self.directory.list_owners().await?;
        let store = &self.store;
        fanout::first_hit(
            &self.config,
            owners.into_iter().map(|owner| owner.id).collect(),
            |owner_id| {
                let store = Arc::clone(store);
                let order_id = order_id.to_string();
                async move {
                    let partition = Partition::OwnerOrders(owner_id.clone());
                    let doc = store.get(&partition, &order_id).await?;
                    Ok(doc.map(|doc| Located {
                        path: OrderPath::Partition { owner_id },
                        doc,
                    }))
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StoreDirectory;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn orders_of(owner: &str) -> Partition {
        Partition::OwnerOrders(owner.to_string())
    }

    fn create_test_locator(store: Arc<MemoryStore>) -> OrderLocator {
        let directory = Arc::new(StoreDirectory::new(store.clone()));
        OrderLocator::new(store, directory, RepoConfig::default())
    }

    fn seed_world(store: &MemoryStore) {
        store.seed(Partition::Owners, "u1", json!({"displayName": "One"}));
        store.seed(Partition::Owners, "u2", json!({"displayName": "Two"}));
        store.seed(orders_of("u1"), "o1", json!({"status": "pending"}));
        store.seed(orders_of("u2"), "o2", json!({"status": "cooking"}));
        store.seed(Partition::LegacyOrders, "o0", json!({"status": "delivered", "userId": "u9"}));
    }

    #[tokio::test]
    async fn test_direct_read_when_owner_known() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        let locator = create_test_locator(store);

        let located = locator.locate(Some("u1"), "o1").await.unwrap();
        assert_eq!(
            located.path,
            OrderPath::Partition { owner_id: "u1".to_string() }
        );
        assert_eq!(located.doc.key, "o1");
    }

    #[tokio::test]
    async fn test_scatter_resolves_unknown_owner() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        let locator = create_test_locator(store);

        let located = locator.locate(None, "o2").await.unwrap();
        assert_eq!(located.path.owner_id(), Some("u2"));
    }

    #[tokio::test]
    async fn test_probing_when_scatter_unsupported() {
        let store = Arc::new(MemoryStore::without_scatter());
        seed_world(&store);
        let locator = create_test_locator(store);

        let located = locator.locate(None, "o2").await.unwrap();
        assert_eq!(located.path.owner_id(), Some("u2"));
    }

    #[tokio::test]
    async fn test_failing_scatter_demotes_to_probing() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        store.set_scatter_index_missing(true);
        let locator = create_test_locator(store);

        let located = locator.locate(None, "o2").await.unwrap();
        assert_eq!(located.path.owner_id(), Some("u2"));
    }

    #[tokio::test]
    async fn test_wrong_owner_hint_still_finds_the_order() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        let locator = create_test_locator(store);

        let located = locator.locate(Some("u1"), "o2").await.unwrap();
        assert_eq!(located.path.owner_id(), Some("u2"));
    }

    #[tokio::test]
    async fn test_legacy_tier() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        let locator = create_test_locator(store);

        let located = locator.locate(None, "o0").await.unwrap();
        assert_eq!(located.path, OrderPath::Legacy);
        assert_eq!(located.path.owner_id(), None);
    }

    #[tokio::test]
    async fn test_clean_miss_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        seed_world(&store);
        let locator = create_test_locator(store);

        let err = locator.locate(None, "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_degraded_miss_is_partition_scan() {
        let store = Arc::new(MemoryStore::without_scatter());
        seed_world(&store);
        store.fail_partition(orders_of("u2"), "partition offline");
        let locator = create_test_locator(store);

        // o2 lives in the unreadable partition; absence cannot be asserted
        let err = locator.locate(None, "o2").await.unwrap_err();
        assert!(matches!(err, RepoError::PartitionScan(_)));
    }

    #[tokio::test]
    async fn test_legacy_hit_survives_a_degraded_sweep() {
        let store = Arc::new(MemoryStore::without_scatter());
        seed_world(&store);
        store.fail_partition(orders_of("u2"), "partition offline");
        let locator = create_test_locator(store);

        let located = locator.locate(None, "o0").await.unwrap();
        assert_eq!(located.path, OrderPath::Legacy);
    }
}
