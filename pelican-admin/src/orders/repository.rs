//! Order Repository
//!
//! The facade the admin panel talks to. Wires the locator, normalizer and
//! aggregator together over one partition store and exposes plain
//! create/read/update/delete/list/transition operations. Callers never see
//! a raw record or a partition path.
//!
//! Write discipline: new orders are normalized before they are stored, so
//! partitions only ever gain canonical records; updates patch raw fields
//! and set `updatedAt` server-side; `createdAt` is immutable everywhere.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use shared::{Order, OrderStatistics, OrderStatus, OrderWithOwner, Owner};

use crate::core::config::RepoConfig;
use crate::core::error::{RepoError, RepoResult};
use crate::directory::OwnerDirectory;
use crate::orders::locator::OrderLocator;
use crate::orders::normalize::{normalize_order, try_normalize_document};
use crate::orders::scatter_preferred;
use crate::orders::stats::OrderAggregator;
use crate::store::{FieldFilter, ListQuery, Partition, PartitionStore};
use crate::utils::fanout;
use crate::utils::validation;

/// Global listing with its degraded-read annotation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListing {
    /// Newest first, by canonical creation time
    pub orders: Vec<OrderWithOwner>,
    /// True when unreadable partitions were skipped
    pub partial: bool,
    pub failed_owners: Vec<String>,
}

pub struct OrderRepository {
    store: Arc<dyn PartitionStore>,
    directory: Arc<dyn OwnerDirectory>,
    locator: OrderLocator,
    aggregator: OrderAggregator,
    config: RepoConfig,
}

impl OrderRepository {
    pub fn new(
        store: Arc<dyn PartitionStore>,
        directory: Arc<dyn OwnerDirectory>,
        config: RepoConfig,
    ) -> Self {
        Self {
            locator: OrderLocator::new(
                Arc::clone(&store),
                Arc::clone(&directory),
                config.clone(),
            ),
            aggregator: OrderAggregator::new(
                Arc::clone(&store),
                Arc::clone(&directory),
                config.clone(),
            ),
            store,
            directory,
            config,
        }
    }

    // ========== Create ==========

    /// Create an order in the owner's partition. Returns the new order id.
    pub async fn create_order(
        &self,
        owner_id: &str,
        data: Map<String, Value>,
    ) -> RepoResult<String> {
        self.create_with_status(owner_id, data, None).await
    }

    /// Create a draft: identical to [`create_order`](Self::create_order)
    /// except the status is forced to `draft` whatever the payload says.
    pub async fn create_draft_order(
        &self,
        owner_id: &str,
        data: Map<String, Value>,
    ) -> RepoResult<String> {
        self.create_with_status(owner_id, data, Some(OrderStatus::Draft))
            .await
    }

    async fn create_with_status(
        &self,
        owner_id: &str,
        mut data: Map<String, Value>,
        forced: Option<OrderStatus>,
    ) -> RepoResult<String> {
        if owner_id.is_empty() {
            return Err(RepoError::InvalidPayload("owner id must not be empty".to_string()));
        }
        validation::validate_order_payload(&data)?;

        // Identity and clock are server-side; client values never win here
        let order_id = Uuid::new_v4().to_string();
        data.insert("id".to_string(), json!(order_id));
        data.remove("createdAt");
        data.remove("updatedAt");
        if let Some(status) = forced {
            data.insert("status".to_string(), json!(status.as_str()));
        }

        // New writes go through the normalizer, so partitions only ever
        // gain canonical records
        let order = normalize_order(&data, owner_id);
        let record = serde_json::to_value(&order)
            .map_err(|e| RepoError::InvalidPayload(format!("order not serializable: {e}")))?;

        self.store
            .put(&Partition::OwnerOrders(owner_id.to_string()), &order_id, record)
            .await
            .map_err(RepoError::Write)?;

        tracing::info!(
            order_id = %order_id,
            owner_id = %owner_id,
            status = %order.status,
            "order created"
        );
        Ok(order_id)
    }

    // ========== Read ==========

    /// Fetch one order, canonical. The owner id is optional; without it the
    /// locator sweeps the partitions and the result is identical to the
    /// owner-qualified read.
    pub async fn get_order(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<Order> {
        let located = self.locator.locate(owner_id, order_id).await?;
        let owner = located.path.owner_id().unwrap_or_default();
        try_normalize_document(&located.doc, owner)
    }

    /// All orders in one owner's partition, newest first
    pub async fn list_orders_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Order>> {
        let partition = Partition::OwnerOrders(owner_id.to_string());
        let query = ListQuery::all().order_by_desc("createdAt");
        let docs = self.store.list(&partition, &query).await?;

        // Store ordering is advisory over mixed-era records; re-sort on the
        // canonical timestamp after normalization
        let mut orders: Vec<Order> = docs
            .iter()
            .filter_map(|doc| keep_normalizable(try_normalize_document(doc, owner_id), &doc.key))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Every order across every partition, enriched with owner contact info
    /// and sorted newest first.
    pub async fn list_all_orders(&self) -> RepoResult<OrderListing> {
        let owners = self.directory.list_owners().await?;
        let owner_index: HashMap<String, Owner> = owners
            .iter()
            .map(|owner| (owner.id.clone(), owner.clone()))
            .collect();

        let (mut orders, failed_owners) = if scatter_preferred(self.store.as_ref(), &self.config) {
            match self.list_scattered(&owner_index).await {
                Ok(orders) => (orders, Vec::new()),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "scatter listing failed, enumerating partitions instead"
                    );
                    self.list_enumerated(&owners, &owner_index).await?
                }
            }
        } else {
            self.list_enumerated(&owners, &owner_index).await?
        };

        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(OrderListing {
            partial: !failed_owners.is_empty(),
            failed_owners,
            orders,
        })
    }

    async fn list_scattered(
        &self,
        owner_index: &HashMap<String, Owner>,
    ) -> RepoResult<Vec<OrderWithOwner>> {
        let hits = self.store.scatter(&ListQuery::all()).await?;
        Ok(hits
            .iter()
            .filter_map(|hit| {
                keep_normalizable(try_normalize_document(&hit.doc, &hit.owner_id), &hit.doc.key)
            })
            .map(|order| enrich(order, owner_index))
            .collect())
    }

    async fn list_enumerated(
        &self,
        owners: &[Owner],
        owner_index: &HashMap<String, Owner>,
    ) -> RepoResult<(Vec<OrderWithOwner>, Vec<String>)> {
        let store = &self.store;
        let outcome = fanout::gather(
            &self.config,
            owners.iter().map(|owner| owner.id.clone()).collect(),
            |owner_id| {
                let store = Arc::clone(store);
                async move {
                    let partition = Partition::OwnerOrders(owner_id.clone());
                    let docs = store.list(&partition, &ListQuery::all()).await?;
                    let orders: Vec<Order> = docs
                        .iter()
                        .filter_map(|doc| {
                            keep_normalizable(try_normalize_document(doc, &owner_id), &doc.key)
                        })
                        .collect();
                    Ok(orders)
                }
            },
        )
        .await?;

        if outcome.is_partial() {
            tracing::warn!(
                failed = ?outcome.failed_owner_ids(),
                "listing computed without unreadable partitions"
            );
        }
        let failed_owners = outcome.failed_owner_ids();
        let orders = outcome
            .items
            .into_iter()
            .flatten()
            .map(|order| enrich(order, owner_index))
            .collect();
        Ok((orders, failed_owners))
    }

    // ========== Update / Delete ==========

    /// Patch fields on an order wherever it lives. `createdAt` is immutable
    /// and silently stripped; `updatedAt` is set server-side.
    pub async fn update_order(
        &self,
        owner_id: Option<&str>,
        order_id: &str,
        mut patch: Map<String, Value>,
    ) -> RepoResult<()> {
        validation::validate_order_payload(&patch)?;
        patch.remove("createdAt");
        patch.insert("updatedAt".to_string(), json!(Utc::now()));

        let located = self.locator.locate(owner_id, order_id).await?;
        let partition = located.path.partition();
        self.store
            .patch(&partition, order_id, patch)
            .await
            .map_err(RepoError::Write)?;

        tracing::info!(order_id = %order_id, partition = %partition, "order updated");
        Ok(())
    }

    /// Delete an order wherever it lives
    pub async fn delete_order(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<()> {
        let located = self.locator.locate(owner_id, order_id).await?;
        let partition = located.path.partition();
        self.store
            .remove(&partition, order_id)
            .await
            .map_err(RepoError::Write)?;

        tracing::info!(order_id = %order_id, partition = %partition, "order deleted");
        Ok(())
    }

    // ========== Status Transitions ==========

    /// Write a status change: exactly `status`, `updatedAt`, and whatever
    /// extra fields the transition carries. Nothing else on the record is
    /// touched.
    pub async fn transition_status(
        &self,
        owner_id: Option<&str>,
        order_id: &str,
        new_status: &str,
        extra: Option<Map<String, Value>>,
    ) -> RepoResult<()> {
        if new_status.is_empty() {
            return Err(RepoError::InvalidPayload("status must not be empty".to_string()));
        }
        if OrderStatus::from_code(new_status).is_none() {
            tracing::debug!(status = %new_status, "transition to a status code this panel does not know");
        }

        let mut fields = extra.unwrap_or_default();
        validation::validate_order_payload(&fields)?;
        fields.insert("status".to_string(), json!(new_status));
        fields.insert("updatedAt".to_string(), json!(Utc::now()));
        fields.remove("createdAt");

        let located = self.locator.locate(owner_id, order_id).await?;
        self.store
            .patch(&located.path.partition(), order_id, fields)
            .await
            .map_err(RepoError::Write)?;

        tracing::info!(order_id = %order_id, status = %new_status, "order status changed");
        Ok(())
    }

    /// Accept an incoming order (stamps `acceptedAt`)
    pub async fn accept_order(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<()> {
        self.transition_status(
            owner_id,
            order_id,
            OrderStatus::Accepted.as_str(),
            Some(stamp("acceptedAt")),
        )
        .await
    }

    /// Hand the order to a driver (stamps `startedAt`)
    pub async fn start_delivery(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<()> {
        self.transition_status(
            owner_id,
            order_id,
            OrderStatus::OnTheWay.as_str(),
            Some(stamp("startedAt")),
        )
        .await
    }

    /// Close out a delivery (stamps `deliveredAt`)
    pub async fn mark_delivered(&self, owner_id: Option<&str>, order_id: &str) -> RepoResult<()> {
        self.transition_status(
            owner_id,
            order_id,
            OrderStatus::Delivered.as_str(),
            Some(stamp("deliveredAt")),
        )
        .await
    }

    // ========== Aggregation ==========

    /// Per-status counts, optionally restricted by one equality filter
    pub async fn get_statistics(
        &self,
        filter: Option<&FieldFilter>,
    ) -> RepoResult<OrderStatistics> {
        self.aggregator.count_by_status(filter).await
    }
}

fn stamp(field: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(field.to_string(), json!(Utc::now()));
    fields
}

fn enrich(order: Order, owners: &HashMap<String, Owner>) -> OrderWithOwner {
    let (owner_name, owner_email) = match owners.get(&order.owner_id) {
        Some(owner) => (owner.label().to_string(), owner.email.clone()),
        None => (String::new(), String::new()),
    };
    OrderWithOwner {
        order,
        owner_name,
        owner_email,
    }
}

/// Listing reads skip records that cannot be coerced instead of failing
/// the whole page
fn keep_normalizable(result: RepoResult<Order>, key: &str) -> Option<Order> {
    match result {
        Ok(order) => Some(order),
        Err(err) => {
            tracing::warn!(record_id = %key, error = %err, "skipping unreadable record");
            None
        }
    }
}
