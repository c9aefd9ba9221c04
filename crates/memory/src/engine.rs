//! The tiered knowledge engine.
//!
//! Routes new items into short-term, long-term or context memory, ranks
//! items across tiers for a query, and evicts low-importance items.
//!
//! Routing (first match wins):
//! 1. context-specific items go to [`Tier::Context`]
//! 2. importance above the routing threshold (0.7) goes to [`Tier::LongTerm`]
//! 3. everything else goes to [`Tier::ShortTerm`]

use futures::future::{join_all, try_join};
use mastermind_core::error::{Error, Result};
use mastermind_core::knowledge::{KnowledgeItem, RecordFilter, RecordStore, RecordUpdate, Tier};
use mastermind_core::provider::Embedder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::tier_store::TierStore;
use crate::vector;

/// Thresholds that drive routing and eviction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnowledgePolicy {
    /// Items with importance strictly above this go to long-term memory
    pub routing_threshold: f32,
    pub short_term_threshold: Option<f32>,
    pub long_term_threshold: Option<f32>,
}

impl KnowledgePolicy {
    pub fn route(&self, importance: f32, is_context_specific: bool) -> Tier {
        if is_context_specific {
            Tier::Context
        } else if importance > self.routing_threshold {
            Tier::LongTerm
        } else {
            Tier::ShortTerm
        }
    }
}

impl Default for KnowledgePolicy {
    fn default() -> Self {
        Self {
            routing_threshold: 0.7,
            short_term_threshold: Tier::ShortTerm.default_eviction_threshold(),
            long_term_threshold: Tier::LongTerm.default_eviction_threshold(),
        }
    }
}

/// Arguments for [`KnowledgeEngine::store_knowledge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_importance")]
    pub importance: f32,
    #[serde(default)]
    pub is_context_specific: bool,
}

fn default_category() -> String {
    "general".into()
}
fn default_importance() -> f32 {
    0.5
}

impl StoreRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: default_category(),
            importance: default_importance(),
            is_context_specific: false,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn importance(mut self, importance: f32) -> Self {
        self.importance = importance;
        self
    }

    pub fn context_specific(mut self, is_context_specific: bool) -> Self {
        self.is_context_specific = is_context_specific;
        self
    }
}

/// Arguments for [`KnowledgeEngine::retrieve_knowledge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_true")]
    pub include_short_term: bool,
    #[serde(default = "default_true")]
    pub include_long_term: bool,
    #[serde(default = "default_true")]
    pub include_context: bool,
    #[serde(default = "default_min_importance")]
    pub min_importance: f32,
    /// Only consider items of this category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_max_results() -> usize {
    5
}
fn default_true() -> bool {
    true
}
fn default_min_importance() -> f32 {
    0.3
}

impl RetrieveRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: default_max_results(),
            include_short_term: true,
            include_long_term: true,
            include_context: true,
            min_importance: default_min_importance(),
            category: None,
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn min_importance(mut self, min_importance: f32) -> Self {
        self.min_importance = min_importance;
        self
    }

    pub fn short_term(mut self, include: bool) -> Self {
        self.include_short_term = include;
        self
    }

    pub fn long_term(mut self, include: bool) -> Self {
        self.include_long_term = include;
        self
    }

    pub fn context(mut self, include: bool) -> Self {
        self.include_context = include;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The tiers this request searches.
    pub fn tiers(&self) -> Vec<Tier> {
        Tier::ALL
            .into_iter()
            .filter(|tier| match tier {
                Tier::ShortTerm => self.include_short_term,
                Tier::LongTerm => self.include_long_term,
                Tier::Context => self.include_context,
            })
            .collect()
    }
}

/// IDs removed by one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.short_term.len() + self.long_term.len()
    }
}

/// Item count per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub short_term: usize,
    pub long_term: usize,
    pub context: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.short_term + self.long_term + self.context
    }
}

fn validate_importance(importance: f32) -> Result<()> {
    if (0.0..=1.0).contains(&importance) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "importance must be between 0.0 and 1.0 (got {importance})"
        )))
    }
}

/// Owns the three tiers and the embedder.
pub struct KnowledgeEngine {
    short_term: TierStore,
    long_term: TierStore,
    context: TierStore,
    embedder: Arc<dyn Embedder>,
    policy: KnowledgePolicy,
}

impl KnowledgeEngine {
    /// Build an engine with the default policy. All tiers share `store`,
    /// each in its own collection.
    pub fn new(store: Arc<dyn RecordStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_policy(store, embedder, KnowledgePolicy::default())
    }

    pub fn with_policy(
        store: Arc<dyn RecordStore>,
        embedder: Arc<dyn Embedder>,
        policy: KnowledgePolicy,
    ) -> Self {
        Self {
            short_term: TierStore::new(Tier::ShortTerm, store.clone())
                .with_threshold(policy.short_term_threshold),
            long_term: TierStore::new(Tier::LongTerm, store.clone())
                .with_threshold(policy.long_term_threshold),
            context: TierStore::new(Tier::Context, store),
            embedder,
            policy,
        }
    }

    pub fn policy(&self) -> &KnowledgePolicy {
        &self.policy
    }

    pub fn tier(&self, tier: Tier) -> &TierStore {
        match tier {
            Tier::ShortTerm => &self.short_term,
            Tier::LongTerm => &self.long_term,
            Tier::Context => &self.context,
        }
    }

    /// Embed and persist new knowledge. Returns the new item's ID.
    pub async fn store_knowledge(&self, request: StoreRequest) -> Result<String> {
        validate_importance(request.importance)?;

        let tier = self
            .policy
            .route(request.importance, request.is_context_specific);
        let embedding = self.embedder.embed(&request.content).await?;
        let item = KnowledgeItem::new(
            request.content,
            embedding,
            request.category,
            request.importance,
            tier,
        );

        let id = self.tier(tier).store(item).await?;
        info!(%id, %tier, importance = request.importance, "Stored knowledge");
        Ok(id)
    }

    /// Rank items from the requested tiers against `request.query`.
    pub async fn retrieve_knowledge(&self, request: RetrieveRequest) -> Result<Vec<KnowledgeItem>> {
        if request.max_results == 0 {
            return Ok(Vec::new());
        }

        let tiers = request.tiers();
        if tiers.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(&request.query).await?;

        let mut filter = RecordFilter::all().min_importance(request.min_importance);
        filter.category = request.category.clone();

        // Hold every searched tier steady so a concurrent retier cannot
        // show the same item in two tiers.
        let mut gates = Vec::with_capacity(tiers.len());
        for tier in &tiers {
            gates.push(self.tier(*tier).shared().await);
        }
        let results = join_all(
            tiers
                .iter()
                .map(|tier| self.tier(*tier).query_unlocked(&filter, request.max_results)),
        )
        .await;
        drop(gates);

        let mut candidates = Vec::new();
        for result in results {
            candidates.extend(result?);
        }

        let ranked = vector::rank(candidates, &query_embedding, request.max_results);
        debug!(
            query = %request.query,
            tiers = tiers.len(),
            results = ranked.len(),
            "Retrieved knowledge"
        );
        Ok(ranked)
    }

    /// Set the importance of an item in the tier named by `memory_type`.
    ///
    /// Returns `false` when the item is not in that tier. Never moves the
    /// item, even if the new importance would route it elsewhere.
    pub async fn update_importance(
        &self,
        entry_id: &str,
        new_importance: f32,
        memory_type: &str,
    ) -> Result<bool> {
        let tier: Tier = memory_type.parse()?;
        validate_importance(new_importance)?;

        let updated = self
            .tier(tier)
            .update(entry_id, RecordUpdate::importance(new_importance))
            .await?;
        if updated {
            info!(id = %entry_id, %tier, importance = new_importance, "Updated importance");
        }
        Ok(updated)
    }

    /// Evict low-importance items from short- and long-term memory.
    ///
    /// Both tiers are cleaned concurrently; context memory is never touched.
    pub async fn cleanup_memories(&self) -> Result<CleanupReport> {
        let (short_term, long_term) =
            try_join(self.short_term.evict(), self.long_term.evict()).await?;

        let report = CleanupReport {
            short_term,
            long_term,
        };
        info!(
            short_term = report.short_term.len(),
            long_term = report.long_term.len(),
            "Memory cleanup complete"
        );
        Ok(report)
    }

    /// Move an item between tiers, keeping its ID.
    ///
    /// Both tiers are locked for the whole move, so readers see the item in
    /// exactly one of them. If the source copy cannot be removed, the new
    /// copy is rolled back and the error is returned.
    pub async fn retier(&self, entry_id: &str, from: Tier, to: Tier) -> Result<bool> {
        if from == to {
            return Ok(self.tier(from).get(entry_id).await?.is_some());
        }

        let (source, target) = (self.tier(from), self.tier(to));
        let _gates = if from < to {
            let first = source.exclusive().await;
            (first, target.exclusive().await)
        } else {
            let first = target.exclusive().await;
            (source.exclusive().await, first)
        };

        let Some(mut item) = source.get_unlocked(entry_id).await? else {
            return Ok(false);
        };
        item.updated_at = chrono::Utc::now();
        target.store_unlocked(item).await?;

        if let Err(e) = source.delete_unlocked(entry_id).await {
            if let Err(rollback) = target.delete_unlocked(entry_id).await {
                warn!(id = %entry_id, %to, error = %rollback, "Failed to roll back retier copy");
            }
            return Err(e.into());
        }
        info!(id = %entry_id, %from, %to, "Moved knowledge between tiers");
        Ok(true)
    }

    pub async fn get_knowledge(&self, entry_id: &str, tier: Tier) -> Result<Option<KnowledgeItem>> {
        Ok(self.tier(tier).get(entry_id).await?)
    }

    pub async fn delete_knowledge(&self, entry_id: &str, tier: Tier) -> Result<bool> {
        let deleted = self.tier(tier).delete(entry_id).await?;
        if deleted {
            info!(id = %entry_id, %tier, "Deleted knowledge");
        }
        Ok(deleted)
    }

    pub async fn tier_counts(&self) -> Result<TierCounts> {
        Ok(TierCounts {
            short_term: self.short_term.count().await?,
            long_term: self.long_term.count().await?,
            context: self.context.count().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use async_trait::async_trait;
    use mastermind_core::error::{EmbeddingError, StoreError};
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Embeds every text to the same unit vector.
    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Embeds "north..." along one axis and everything else along the other.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            if text.starts_with("north") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Failed("service down".into()))
        }
    }

    /// Record store whose queries always fail.
    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        async fn create(&self, _c: &str, item: KnowledgeItem) -> std::result::Result<String, StoreError> {
            Ok(item.id)
        }
        async fn read(&self, _c: &str, _id: &str) -> std::result::Result<Option<KnowledgeItem>, StoreError> {
            Ok(None)
        }
        async fn update(&self, _c: &str, _id: &str, _u: RecordUpdate) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }
        async fn delete(&self, _c: &str, _id: &str) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }
        async fn query(
            &self,
            _c: &str,
            _f: &RecordFilter,
            _l: usize,
        ) -> std::result::Result<Vec<KnowledgeItem>, StoreError> {
            Err(StoreError::QueryFailed("disk on fire".into()))
        }
        async fn count(&self, _c: &str) -> std::result::Result<usize, StoreError> {
            Ok(0)
        }
    }

    /// In-memory store that can fail deletes in one collection and can make
    /// every query wait at a barrier.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryRecordStore,
        fail_deletes_in: Option<&'static str>,
        query_barrier: Option<Arc<Barrier>>,
    }

    #[async_trait]
    impl RecordStore for ScriptedStore {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn create(&self, c: &str, item: KnowledgeItem) -> std::result::Result<String, StoreError> {
            self.inner.create(c, item).await
        }
        async fn read(&self, c: &str, id: &str) -> std::result::Result<Option<KnowledgeItem>, StoreError> {
            self.inner.read(c, id).await
        }
        async fn update(&self, c: &str, id: &str, u: RecordUpdate) -> std::result::Result<bool, StoreError> {
            self.inner.update(c, id, u).await
        }
        async fn delete(&self, c: &str, id: &str) -> std::result::Result<bool, StoreError> {
            if self.fail_deletes_in == Some(c) {
                return Err(StoreError::Storage("delete failed".into()));
            }
            self.inner.delete(c, id).await
        }
        async fn query(
            &self,
            c: &str,
            f: &RecordFilter,
            l: usize,
        ) -> std::result::Result<Vec<KnowledgeItem>, StoreError> {
            if let Some(barrier) = &self.query_barrier {
                barrier.wait().await;
            }
            self.inner.query(c, f, l).await
        }
        async fn count(&self, c: &str) -> std::result::Result<usize, StoreError> {
            self.inner.count(c).await
        }
    }

    fn engine() -> KnowledgeEngine {
        KnowledgeEngine::new(Arc::new(InMemoryRecordStore::new()), Arc::new(ConstantEmbedder))
    }

    async fn tier_of(engine: &KnowledgeEngine, id: &str) -> Option<Tier> {
        for tier in Tier::ALL {
            if engine.get_knowledge(id, tier).await.unwrap().is_some() {
                return Some(tier);
            }
        }
        None
    }

    #[tokio::test]
    async fn routing_is_deterministic() {
        let engine = engine();
        let cases = [
            (0.71, false, Tier::LongTerm),
            (0.7, false, Tier::ShortTerm),
            (0.0, false, Tier::ShortTerm),
            (1.0, false, Tier::LongTerm),
            (0.99, true, Tier::Context),
            (0.1, true, Tier::Context),
        ];
        for (importance, context, expected) in cases {
            let id = engine
                .store_knowledge(
                    StoreRequest::new("fact")
                        .importance(importance)
                        .context_specific(context),
                )
                .await
                .unwrap();
            assert_eq!(tier_of(&engine, &id).await, Some(expected), "importance {importance}");
        }
    }

    #[tokio::test]
    async fn store_defaults() {
        let engine = engine();
        let id = engine.store_knowledge(StoreRequest::new("plain")).await.unwrap();
        let item = engine.get_knowledge(&id, Tier::ShortTerm).await.unwrap().unwrap();
        assert_eq!(item.category, "general");
        assert_eq!(item.importance, 0.5);
        assert_eq!(item.embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn out_of_range_importance_rejected() {
        let engine = engine();
        for bad in [1.5, -0.1, f32::NAN] {
            let err = engine
                .store_knowledge(StoreRequest::new("x").importance(bad))
                .await
                .unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(engine.tier_counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn retrieval_ranks_by_importance_and_truncates() {
        let engine = engine();
        for importance in [0.9, 0.5, 0.2, 0.8] {
            engine
                .store_knowledge(StoreRequest::new(format!("item {importance}")).importance(importance))
                .await
                .unwrap();
        }

        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("anything").max_results(2))
            .await
            .unwrap();
        let importances: Vec<f32> = results.iter().map(|i| i.importance).collect();
        assert_eq!(importances, vec![0.9, 0.8]);
        assert!(results.iter().all(|i| (i.relevance - 1.0).abs() < 1e-6));
    }

    #[tokio::test]
    async fn retrieval_applies_min_importance() {
        let engine = engine();
        for importance in [0.9, 0.5, 0.2, 0.8] {
            engine
                .store_knowledge(StoreRequest::new("x").importance(importance))
                .await
                .unwrap();
        }
        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("x").max_results(10))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|i| i.importance >= 0.3));
    }

    #[tokio::test]
    async fn retrieval_relevance_breaks_ties() {
        let engine = KnowledgeEngine::new(Arc::new(InMemoryRecordStore::new()), Arc::new(AxisEmbedder));
        let south = engine
            .store_knowledge(StoreRequest::new("south pole").importance(0.6))
            .await
            .unwrap();
        let north = engine
            .store_knowledge(StoreRequest::new("north pole").importance(0.6))
            .await
            .unwrap();

        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("north star"))
            .await
            .unwrap();
        assert_eq!(results[0].id, north);
        assert_eq!(results[1].id, south);
    }

    #[tokio::test]
    async fn retrieval_respects_tier_flags_and_category() {
        let engine = engine();
        engine
            .store_knowledge(StoreRequest::new("long").importance(0.9))
            .await
            .unwrap();
        let ctx = engine
            .store_knowledge(StoreRequest::new("ctx").context_specific(true).category("code"))
            .await
            .unwrap();

        let only_context = engine
            .retrieve_knowledge(RetrieveRequest::new("q").short_term(false).long_term(false))
            .await
            .unwrap();
        assert_eq!(only_context.len(), 1);
        assert_eq!(only_context[0].id, ctx);

        let only_code = engine
            .retrieve_knowledge(RetrieveRequest::new("q").category("code"))
            .await
            .unwrap();
        assert_eq!(only_code.len(), 1);

        let none = engine
            .retrieve_knowledge(RetrieveRequest::new("q").short_term(false).long_term(false).context(false))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn zero_max_results_skips_everything() {
        let engine = KnowledgeEngine::new(Arc::new(BrokenStore), Arc::new(FailingEmbedder));
        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("q").max_results(0))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn failing_tier_fails_retrieval() {
        let engine = KnowledgeEngine::new(Arc::new(BrokenStore), Arc::new(ConstantEmbedder));
        let err = engine
            .retrieve_knowledge(RetrieveRequest::new("q"))
            .await
            .unwrap_err();
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn embedding_failure_surfaces() {
        let engine = KnowledgeEngine::new(Arc::new(InMemoryRecordStore::new()), Arc::new(FailingEmbedder));
        let err = engine
            .store_knowledge(StoreRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn update_importance_is_idempotent_and_never_moves() {
        let engine = engine();
        let id = engine
            .store_knowledge(StoreRequest::new("x").importance(0.4))
            .await
            .unwrap();

        assert!(engine.update_importance(&id, 0.95, "short_term").await.unwrap());
        let first = engine.get_knowledge(&id, Tier::ShortTerm).await.unwrap().unwrap();
        assert!(engine.update_importance(&id, 0.95, "short_term").await.unwrap());
        let second = engine.get_knowledge(&id, Tier::ShortTerm).await.unwrap().unwrap();

        assert_eq!(first.importance, 0.95);
        assert_eq!(second.importance, 0.95);
        assert_eq!(first.content, second.content);
        assert_eq!(tier_of(&engine, &id).await, Some(Tier::ShortTerm));
    }

    #[tokio::test]
    async fn update_importance_wrong_tier_or_bad_input() {
        let engine = engine();
        let id = engine
            .store_knowledge(StoreRequest::new("x").importance(0.4))
            .await
            .unwrap();

        assert!(!engine.update_importance(&id, 0.6, "long_term").await.unwrap());
        assert!(!engine.update_importance("missing", 0.6, "short_term").await.unwrap());
        assert!(engine.update_importance(&id, 0.6, "mid_term").await.unwrap_err().is_validation());
        assert!(engine.update_importance(&id, 2.0, "short_term").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn cleanup_uses_tier_thresholds() {
        let engine = engine();
        let short_low = engine.store_knowledge(StoreRequest::new("a").importance(0.1)).await.unwrap();
        let short_edge = engine.store_knowledge(StoreRequest::new("b").importance(0.2)).await.unwrap();
        let long_keep = engine.store_knowledge(StoreRequest::new("c").importance(0.9)).await.unwrap();
        let ctx = engine
            .store_knowledge(StoreRequest::new("d").importance(0.0).context_specific(true))
            .await
            .unwrap();

        // Demote a long-term item below its threshold without moving it.
        let long_low = engine.store_knowledge(StoreRequest::new("e").importance(0.8)).await.unwrap();
        engine.update_importance(&long_low, 0.45, "long_term").await.unwrap();

        let report = engine.cleanup_memories().await.unwrap();
        assert_eq!(report.short_term, vec![short_low.clone()]);
        assert_eq!(report.long_term, vec![long_low.clone()]);
        assert_eq!(report.total(), 2);

        assert_eq!(tier_of(&engine, &short_low).await, None);
        assert_eq!(tier_of(&engine, &long_low).await, None);
        assert_eq!(tier_of(&engine, &short_edge).await, Some(Tier::ShortTerm));
        assert_eq!(tier_of(&engine, &long_keep).await, Some(Tier::LongTerm));
        assert_eq!(tier_of(&engine, &ctx).await, Some(Tier::Context));
    }

    #[tokio::test]
    async fn retier_moves_item_with_same_id() {
        let engine = engine();
        let id = engine.store_knowledge(StoreRequest::new("x").importance(0.4)).await.unwrap();

        assert!(engine.retier(&id, Tier::ShortTerm, Tier::LongTerm).await.unwrap());
        let moved = engine.get_knowledge(&id, Tier::LongTerm).await.unwrap().unwrap();
        assert_eq!(moved.tier, Tier::LongTerm);
        assert!(moved.updated_at >= moved.created_at);
        assert_eq!(tier_of(&engine, &id).await, Some(Tier::LongTerm));

        assert!(!engine.retier(&id, Tier::ShortTerm, Tier::Context).await.unwrap());
        assert!(engine.retier(&id, Tier::LongTerm, Tier::LongTerm).await.unwrap());
    }

    #[tokio::test]
    async fn delete_and_counts() {
        let engine = engine();
        let id = engine.store_knowledge(StoreRequest::new("x")).await.unwrap();
        engine.store_knowledge(StoreRequest::new("y").importance(0.9)).await.unwrap();
        engine
            .store_knowledge(StoreRequest::new("z").context_specific(true))
            .await
            .unwrap();

        assert_eq!(
            engine.tier_counts().await.unwrap(),
            TierCounts { short_term: 1, long_term: 1, context: 1 }
        );
        assert!(!engine.delete_knowledge(&id, Tier::LongTerm).await.unwrap());
        assert!(engine.delete_knowledge(&id, Tier::ShortTerm).await.unwrap());
        assert_eq!(engine.tier_counts().await.unwrap().short_term, 0);
    }

    #[tokio::test]
    async fn retrieval_ranks_across_all_tiers() {
        let engine = engine();
        for importance in [0.9, 0.8, 0.7, 0.6, 0.5] {
            engine
                .store_knowledge(
                    StoreRequest::new(format!("item {importance}"))
                        .importance(importance)
                        .context_specific(importance == 0.9),
                )
                .await
                .unwrap();
        }
        assert_eq!(
            engine.tier_counts().await.unwrap(),
            TierCounts { short_term: 3, long_term: 1, context: 1 }
        );

        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("anything").max_results(2))
            .await
            .unwrap();
        let ranked: Vec<(f32, Tier)> = results.iter().map(|i| (i.importance, i.tier)).collect();
        assert_eq!(ranked, vec![(0.9, Tier::Context), (0.8, Tier::LongTerm)]);
    }

    #[tokio::test]
    async fn retrieval_queries_tiers_concurrently() {
        let store = ScriptedStore {
            query_barrier: Some(Arc::new(Barrier::new(Tier::ALL.len()))),
            ..Default::default()
        };
        let engine = KnowledgeEngine::new(Arc::new(store), Arc::new(ConstantEmbedder));
        engine.store_knowledge(StoreRequest::new("x").importance(0.9)).await.unwrap();

        // Every tier query waits until all three are in flight.
        let results = tokio::time::timeout(
            Duration::from_secs(5),
            engine.retrieve_knowledge(RetrieveRequest::new("x")),
        )
        .await
        .expect("tier queries ran one after another")
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn store_racing_cleanup_survives() {
        let engine = Arc::new(engine());
        for round in 0..50 {
            engine
                .store_knowledge(StoreRequest::new("stale").importance(0.1))
                .await
                .unwrap();
            let (stored, report) = tokio::join!(
                engine.store_knowledge(StoreRequest::new(format!("fresh {round}")).importance(0.5)),
                engine.cleanup_memories(),
            );
            let id = stored.unwrap();
            let report = report.unwrap();
            assert!(!report.short_term.contains(&id));
            let item = engine.get_knowledge(&id, Tier::ShortTerm).await.unwrap();
            assert_eq!(item.unwrap().content, format!("fresh {round}"));
        }
    }

    #[tokio::test]
    async fn failed_retier_rolls_back() {
        let store = ScriptedStore {
            fail_deletes_in: Some(Tier::ShortTerm.collection()),
            ..Default::default()
        };
        let engine = KnowledgeEngine::new(Arc::new(store), Arc::new(ConstantEmbedder));
        let id = engine.store_knowledge(StoreRequest::new("x").importance(0.4)).await.unwrap();

        let err = engine
            .retier(&id, Tier::ShortTerm, Tier::LongTerm)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Storage(_))));

        assert!(engine.get_knowledge(&id, Tier::ShortTerm).await.unwrap().is_some());
        assert!(engine.get_knowledge(&id, Tier::LongTerm).await.unwrap().is_none());
        let results = engine
            .retrieve_knowledge(RetrieveRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn retier_is_never_seen_in_two_tiers() {
        let engine = Arc::new(engine());
        let id = engine.store_knowledge(StoreRequest::new("x").importance(0.6)).await.unwrap();

        let mover = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for round in 0..50 {
                    let (from, to) = if round % 2 == 0 {
                        (Tier::ShortTerm, Tier::LongTerm)
                    } else {
                        (Tier::LongTerm, Tier::ShortTerm)
                    };
                    assert!(engine.retier(&id, from, to).await.unwrap());
                }
            })
        };

        while !mover.is_finished() {
            let results = engine
                .retrieve_knowledge(RetrieveRequest::new("x").max_results(10))
                .await
                .unwrap();
            assert_eq!(results.len(), 1);
            tokio::task::yield_now().await;
        }
        mover.await.unwrap();
        assert_eq!(tier_of(&engine, &id).await, Some(Tier::ShortTerm));
    }

    #[test]
    fn request_deserialization_defaults() {
        let store: StoreRequest = serde_json::from_str(r#"{"content": "c"}"#).unwrap();
        assert_eq!(store, StoreRequest::new("c"));

        let retrieve: RetrieveRequest = serde_json::from_str(r#"{"query": "q"}"#).unwrap();
        assert_eq!(retrieve, RetrieveRequest::new("q"));
        assert_eq!(retrieve.tiers(), Tier::ALL.to_vec());
    }
}
