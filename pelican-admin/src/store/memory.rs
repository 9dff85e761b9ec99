//! In-memory partition store
//!
//! Backend for tests and local development. Mimics the production store's
//! failure modes as well as its happy path: the scatter capability can be
//! switched off or its index "unprovisioned", and individual partitions
//! can be made unreadable, which is how the fallback tiers get exercised.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{
    Document, ListQuery, Partition, PartitionStore, RawRecord, ScatterHit, SortDirection,
    StoreError, StoreResult,
};

/// DashMap-backed [`PartitionStore`]
pub struct MemoryStore {
    partitions: DashMap<Partition, DashMap<String, Value>>,
    /// Partitions that fail on access, with the message they fail with
    failing: DashMap<Partition, String>,
    scatter_enabled: AtomicBool,
    scatter_index_missing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
            failing: DashMap::new(),
            scatter_enabled: AtomicBool::new(true),
            scatter_index_missing: AtomicBool::new(false),
        }
    }

    /// A store whose deployment never provisioned scatter queries
    pub fn without_scatter() -> Self {
        let store = Self::new();
        store.scatter_enabled.store(false, AtomicOrdering::SeqCst);
        store
    }

    pub fn set_scatter_enabled(&self, enabled: bool) {
        self.scatter_enabled.store(enabled, AtomicOrdering::SeqCst);
    }

    /// Advertise the scatter capability but fail the query itself, the way
    /// a deployment with a dropped index does
    pub fn set_scatter_index_missing(&self, missing: bool) {
        self.scatter_index_missing
            .store(missing, AtomicOrdering::SeqCst);
    }

    /// Make every access to `partition` fail with `Unavailable(message)`
    pub fn fail_partition(&self, partition: Partition, message: impl Into<String>) {
        self.failing.insert(partition, message.into());
    }

    pub fn clear_failure(&self, partition: &Partition) {
        self.failing.remove(partition);
    }

    /// Insert a document without going through the async port
    pub fn seed(&self, partition: Partition, key: impl Into<String>, data: Value) {
        self.partitions
            .entry(partition)
            .or_default()
            .insert(key.into(), data);
    }

    fn check(&self, partition: &Partition) -> StoreResult<()> {
        if let Some(message) = self.failing.get(partition) {
            return Err(StoreError::Unavailable(message.value().clone()));
        }
        Ok(())
    }

    fn matches(data: &Value, query: &ListQuery) -> bool {
        query
            .filters
            .iter()
            .all(|filter| data.get(&filter.field) == Some(&filter.value))
    }

    fn sort(docs: &mut [Document], order_by: &Option<(String, SortDirection)>) {
        if let Some((field, direction)) = order_by {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn get(&self, partition: &Partition, key: &str) -> StoreResult<Option<Document>> {
        self.check(partition)?;
        let doc = self
            .partitions
            .get(partition)
            .and_then(|part| part.get(key).map(|data| Document::new(key, data.value().clone())));
        Ok(doc)
    }

    async fn list(&self, partition: &Partition, query: &ListQuery) -> StoreResult<Vec<Document>> {
        self.check(partition)?;
        let mut docs = Vec::new();
        if let Some(part) = self.partitions.get(partition) {
            for entry in part.iter() {
                if let Some(key) = &query.key
                    && entry.key() != key
                {
                    continue;
                }
                if Self::matches(entry.value(), query) {
                    docs.push(Document::new(entry.key().clone(), entry.value().clone()));
                }
            }
        }
        Self::sort(&mut docs, &query.order_by);
        Ok(docs)
    }

    fn supports_scatter(&self) -> bool {
        self.scatter_enabled.load(AtomicOrdering::SeqCst)
    }

    async fn scatter(&self, query: &ListQuery) -> StoreResult<Vec<ScatterHit>> {
        if !self.supports_scatter() {
            return Err(StoreError::Unavailable(
                "scatter queries not supported by this deployment".to_string(),
            ));
        }
        if self.scatter_index_missing.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::MissingIndex(
                "order partition group".to_string(),
            ));
        }

        let mut hits = Vec::new();
        for part in self.partitions.iter() {
            let Partition::OwnerOrders(owner_id) = part.key() else {
                continue;
            };
            for entry in part.value().iter() {
                if let Some(key) = &query.key
                    && entry.key() != key
                {
                    continue;
                }
                if Self::matches(entry.value(), query) {
                    hits.push(ScatterHit {
                        owner_id: owner_id.clone(),
                        doc: Document::new(entry.key().clone(), entry.value().clone()),
                    });
                }
            }
        }
        if let Some((field, direction)) = &query.order_by {
            hits.sort_by(|a, b| {
                let ordering = compare_values(a.doc.data.get(field), b.doc.data.get(field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        Ok(hits)
    }

    async fn put(&self, partition: &Partition, key: &str, data: Value) -> StoreResult<()> {
        self.check(partition)?;
        self.partitions
            .entry(partition.clone())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn patch(&self, partition: &Partition, key: &str, fields: RawRecord) -> StoreResult<()> {
        self.check(partition)?;
        let part = self
            .partitions
            .get(partition)
            .ok_or_else(|| StoreError::NotFound(format!("{partition}/{key}")))?;
        let mut doc = part
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(format!("{partition}/{key}")))?;
        let Value::Object(existing) = doc.value_mut() else {
            return Err(StoreError::Conflict(format!(
                "{partition}/{key} is not an object"
            )));
        };
        for (field, value) in fields {
            existing.insert(field, value);
        }
        Ok(())
    }

    async fn remove(&self, partition: &Partition, key: &str) -> StoreResult<()> {
        self.check(partition)?;
        if let Some(part) = self.partitions.get(partition) {
            part.remove(key);
        }
        Ok(())
    }
}
