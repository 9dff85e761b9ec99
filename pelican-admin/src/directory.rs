//! Owner Directory
//!
//! Roster of owner accounts. The enumeration fallbacks walk it to learn
//! which order partitions exist, and the global listing uses it to attach
//! contact info to each order.

use std::sync::Arc;

use async_trait::async_trait;

use shared::Owner;

use crate::core::error::RepoResult;
use crate::store::{Document, ListQuery, Partition, PartitionStore};

/// Lookup and listing over owner accounts
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn list_owners(&self) -> RepoResult<Vec<Owner>>;
    async fn get_owner(&self, owner_id: &str) -> RepoResult<Option<Owner>>;
}

/// Directory reading the store's owner roster
pub struct StoreDirectory {
    store: Arc<dyn PartitionStore>,
}

impl StoreDirectory {
    pub fn new(store: Arc<dyn PartitionStore>) -> Self {
        Self { store }
    }

    /// Tolerant decode; the roster predates this panel and has gaps. A
    /// record without its own `id` field is keyed by its document key.
    fn decode(doc: Document) -> Owner {
        let Document { key, data } = doc;
        let mut owner: Owner = serde_json::from_value(data).unwrap_or_default();
        if owner.id.is_empty() {
            owner.id = key;
        }
        owner
    }
}

#[async_trait]
impl OwnerDirectory for StoreDirectory {
    async fn list_owners(&self) -> RepoResult<Vec<Owner>> {
        let docs = self.store.list(&Partition::Owners, &ListQuery::all()).await?;
        Ok(docs.into_iter().map(Self::decode).collect())
    }

    async fn get_owner(&self, owner_id: &str) -> RepoResult<Option<Owner>> {
        let doc = self.store.get(&Partition::Owners, owner_id).await?;
        Ok(doc.map(Self::decode))
    }
}
