//! Tiered knowledge storage for Mastermind.
//!
//! - [`RecordStore`](mastermind_core::RecordStore) backends: in-memory and SQLite
//! - [`TierStore`]: one tier bound to one collection
//! - [`KnowledgeEngine`]: routing, cross-tier retrieval, eviction

pub mod engine;
pub mod in_memory;
pub mod maintenance;
pub mod tier_store;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use engine::{
    CleanupReport, KnowledgeEngine, KnowledgePolicy, RetrieveRequest, StoreRequest, TierCounts,
};
pub use in_memory::InMemoryRecordStore;
pub use maintenance::spawn_periodic_cleanup;
pub use tier_store::TierStore;
pub use vector::cosine_similarity;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordStore;

use mastermind_core::Tier;
use mastermind_core::error::StoreError;

/// Reject collection names that do not belong to a tier.
pub(crate) fn ensure_collection(collection: &str) -> Result<(), StoreError> {
    if Tier::ALL.iter().any(|tier| tier.collection() == collection) {
        Ok(())
    } else {
        Err(StoreError::UnknownCollection(collection.to_string()))
    }
}
