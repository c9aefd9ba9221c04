//! In-memory record store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use mastermind_core::error::StoreError;
use mastermind_core::knowledge::{
    KnowledgeItem, RecordFilter, RecordStore, RecordUpdate, storage_order,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ensure_collection;

/// A record store that keeps each collection in a `Vec`.
pub struct InMemoryRecordStore {
    collections: Arc<RwLock<HashMap<String, Vec<KnowledgeItem>>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self, collection: &str, item: KnowledgeItem) -> Result<String, StoreError> {
        ensure_collection(collection)?;
        let mut collections = self.collections.write().await;
        let items = collections.entry(collection.to_string()).or_default();
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(StoreError::Storage(format!(
                "duplicate id {} in {collection}",
                item.id
            )));
        }
        let id = item.id.clone();
        items.push(item);
        Ok(id)
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        ensure_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|items| items.iter().find(|item| item.id == id))
            .cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: RecordUpdate,
    ) -> Result<bool, StoreError> {
        ensure_collection(collection)?;
        let mut collections = self.collections.write().await;
        match collections
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|item| item.id == id))
        {
            Some(item) => {
                update.apply(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        ensure_collection(collection)?;
        let mut collections = self.collections.write().await;
        let Some(items) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let len_before = items.len();
        items.retain(|item| item.id != id);
        Ok(items.len() < len_before)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<KnowledgeItem>, StoreError> {
        ensure_collection(collection)?;
        let collections = self.collections.read().await;
        let mut results: Vec<KnowledgeItem> = collections
            .get(collection)
            .map(|items| items.iter().filter(|item| filter.matches(item)).cloned().collect())
            .unwrap_or_default();

        results.sort_by(storage_order);
        results.truncate(limit);
        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        ensure_collection(collection)?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len))
    }
}
