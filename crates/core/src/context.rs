//! Context providers — optional extra material for agents.
//!
//! An agent that wants context takes an `Arc<dyn ContextProvider>` at
//! construction; agents without one simply never ask.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One piece of context returned for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    /// Where the snippet came from (tier name, resource name, ...)
    pub source: String,

    pub content: String,

    /// Provider-specific ranking score
    #[serde(default)]
    pub score: f32,
}

/// A named resource that can be exposed to agents as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,

    /// Resource kind (e.g., "directory", "document")
    pub kind: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `limit` snippets relevant to `query`, best first.
    async fn get_context(&self, query: &str, limit: usize) -> Result<Vec<ContextSnippet>>;
}
