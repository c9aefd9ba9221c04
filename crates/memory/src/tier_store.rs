//! A single knowledge tier bound to its own collection.
//!
//! Reads and single-item writes hold the shared side of the tier's gate;
//! eviction holds the exclusive side for its whole decide-then-delete pass,
//! so concurrent callers see the tier either before or after a cleanup.
//!
//! Operations spanning several tiers take the gates themselves (in [`Tier`]
//! order) and then use the `*_unlocked` primitives.

use mastermind_core::error::StoreError;
use mastermind_core::knowledge::{KnowledgeItem, RecordFilter, RecordStore, RecordUpdate, Tier};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub struct TierStore {
    tier: Tier,
    store: Arc<dyn RecordStore>,
    gate: RwLock<()>,
    threshold: Option<f32>,
}

impl TierStore {
    /// Bind `tier` to `store` with the tier's default eviction threshold.
    pub fn new(tier: Tier, store: Arc<dyn RecordStore>) -> Self {
        Self {
            tier,
            store,
            gate: RwLock::new(()),
            threshold: tier.default_eviction_threshold(),
        }
    }

    /// Override the eviction threshold (`None` disables eviction).
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    fn collection(&self) -> &'static str {
        self.tier.collection()
    }

    pub(crate) async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Persist `item` in this tier. The item's `tier` field is overwritten.
    pub async fn store(&self, item: KnowledgeItem) -> Result<String, StoreError> {
        let _shared = self.gate.read().await;
        self.store_unlocked(item).await
    }

    pub(crate) async fn store_unlocked(&self, mut item: KnowledgeItem) -> Result<String, StoreError> {
        item.tier = self.tier;
        self.store.create(self.collection(), item).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        let _shared = self.gate.read().await;
        self.get_unlocked(id).await
    }

    pub(crate) async fn get_unlocked(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        self.store.read(self.collection(), id).await
    }

    pub async fn update(&self, id: &str, update: RecordUpdate) -> Result<bool, StoreError> {
        let _shared = self.gate.read().await;
        self.store.update(self.collection(), id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _shared = self.gate.read().await;
        self.delete_unlocked(id).await
    }

    pub(crate) async fn delete_unlocked(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(self.collection(), id).await
    }

    pub async fn query(
        &self,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<KnowledgeItem>, StoreError> {
        let _shared = self.gate.read().await;
        self.query_unlocked(filter, limit).await
    }

    pub(crate) async fn query_unlocked(
        &self,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<KnowledgeItem>, StoreError> {
        let items = self.store.query(self.collection(), filter, limit).await?;
        debug!(tier = %self.tier, candidates = items.len(), "Tier query");
        Ok(items)
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let _shared = self.gate.read().await;
        self.store.count(self.collection()).await
    }

    /// Delete every item with importance strictly below the threshold.
    ///
    /// Returns the evicted IDs. A tier without a threshold evicts nothing.
    pub async fn evict(&self) -> Result<Vec<String>, StoreError> {
        let Some(threshold) = self.threshold else {
            return Ok(Vec::new());
        };

        let _exclusive = self.gate.write().await;
        let candidates = self
            .store
            .query(
                self.collection(),
                &RecordFilter::all().below_importance(threshold),
                usize::MAX,
            )
            .await?;

        let mut evicted = Vec::with_capacity(candidates.len());
        for item in candidates {
            if self.store.delete(self.collection(), &item.id).await? {
                evicted.push(item.id);
            }
        }

        if !evicted.is_empty() {
            info!(tier = %self.tier, threshold, evicted = evicted.len(), "Evicted low-importance items");
        }
        Ok(evicted)
    }
}

impl std::fmt::Debug for TierStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierStore")
            .field("tier", &self.tier)
            .field("backend", &self.store.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}
