//! Knowledge items, memory tiers, and the record store capability.
//!
//! Knowledge is partitioned into three tiers, each persisted in its own
//! collection so a query against one tier can never see another tier's
//! items:
//! - **ShortTerm**: ordinary items, evicted below importance 0.2
//! - **LongTerm**: high-importance items, evicted below importance 0.5
//! - **Context**: context-specific items, never evicted automatically

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, StoreError};

/// One of the three logical partitions of the knowledge store.
///
/// The declaration order is the lock order for operations that span tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    ShortTerm,
    LongTerm,
    Context,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::ShortTerm, Tier::LongTerm, Tier::Context];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
            Self::Context => "context",
        }
    }

    /// Name of the backing collection (table) for this tier.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term_memory",
            Self::LongTerm => "long_term_memory",
            Self::Context => "context_memory",
        }
    }

    /// Importance below which items are evicted; `None` = never auto-evicted.
    pub fn default_eviction_threshold(&self) -> Option<f32> {
        match self {
            Self::ShortTerm => Some(0.2),
            Self::LongTerm => Some(0.5),
            Self::Context => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short_term" => Ok(Self::ShortTerm),
            "long_term" => Ok(Self::LongTerm),
            "context" => Ok(Self::Context),
            other => Err(Error::validation(format!(
                "unknown memory type '{other}' (expected short_term, long_term or context)"
            ))),
        }
    }
}

/// A single piece of stored knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Unique ID
    pub id: String,

    /// The stored text
    pub content: String,

    /// Embedding of `content` (stored as a blob, never sent over the wire)
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// Free-form category (e.g., "general", "chat_response", "code")
    pub category: String,

    /// Importance in [0, 1]; drives routing and eviction
    pub importance: f32,

    /// The tier that currently owns this item
    pub tier: Tier,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Similarity to the most recent query (set by retrieval, not persisted)
    #[serde(default)]
    pub relevance: f32,
}

impl KnowledgeItem {
    /// Create a new item with a fresh ID and timestamps.
    pub fn new(
        content: impl Into<String>,
        embedding: Vec<f32>,
        category: impl Into<String>,
        importance: f32,
        tier: Tier,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            embedding,
            category: category.into(),
            importance,
            tier,
            created_at: now,
            updated_at: now,
            relevance: 0.0,
        }
    }
}

/// Storage order: importance descending, newest first, then ID.
///
/// Record stores return query results in this order so a bounded query
/// always yields a tier's most important candidates.
pub fn storage_order(a: &KnowledgeItem, b: &KnowledgeItem) -> Ordering {
    b.importance
        .partial_cmp(&a.importance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Predicate for [`RecordStore::query`]. All set conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Keep items with `importance >= min_importance`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_importance: Option<f32>,

    /// Keep items with `importance < below_importance`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below_importance: Option<f32>,

    /// Keep items of exactly this category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn min_importance(mut self, min: f32) -> Self {
        self.min_importance = Some(min);
        self
    }

    pub fn below_importance(mut self, threshold: f32) -> Self {
        self.below_importance = Some(threshold);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, item: &KnowledgeItem) -> bool {
        self.min_importance.is_none_or(|min| item.importance >= min)
            && self.below_importance.is_none_or(|max| item.importance < max)
            && self
                .category
                .as_deref()
                .is_none_or(|category| item.category == category)
    }
}

/// Field changes for [`RecordStore::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub importance: Option<f32>,
    pub category: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordUpdate {
    pub fn importance(importance: f32) -> Self {
        Self {
            importance: Some(importance),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn apply(&self, item: &mut KnowledgeItem) {
        if let Some(importance) = self.importance {
            item.importance = importance;
        }
        if let Some(ref category) = self.category {
            item.category = category.clone();
        }
        if let Some(updated_at) = self.updated_at {
            item.updated_at = updated_at;
        }
    }
}

/// Durable keyed storage for knowledge items.
///
/// Every call names a collection; a tier store always passes its own, so
/// collections never leak into one another.
///
/// Implementations: SQLite (one table per collection), in-memory (testing).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Insert an item atomically. Returns its ID.
    async fn create(&self, collection: &str, item: KnowledgeItem) -> Result<String, StoreError>;

    /// Get an item by ID.
    async fn read(&self, collection: &str, id: &str) -> Result<Option<KnowledgeItem>, StoreError>;

    /// Apply field changes. Returns `false` when the ID does not exist.
    async fn update(&self, collection: &str, id: &str, update: RecordUpdate) -> Result<bool, StoreError>;

    /// Delete an item. Returns `false` when the ID does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Items matching `filter`, in [`storage_order`], at most `limit`.
    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<KnowledgeItem>, StoreError>;

    /// Number of items in a collection.
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}
