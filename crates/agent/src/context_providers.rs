//! Context providers an agent can be composed with.

use async_trait::async_trait;
use mastermind_core::context::{ContextProvider, ContextSnippet, Resource};
use mastermind_core::error::Result;
use mastermind_memory::{KnowledgeEngine, RetrieveRequest};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Serves the top-ranked knowledge items for a query.
pub struct KnowledgeContextProvider {
    engine: Arc<KnowledgeEngine>,
    min_importance: f32,
}

impl KnowledgeContextProvider {
    pub fn new(engine: Arc<KnowledgeEngine>) -> Self {
        Self {
            engine,
            min_importance: RetrieveRequest::new("").min_importance,
        }
    }

    pub fn with_min_importance(mut self, min_importance: f32) -> Self {
        self.min_importance = min_importance;
        self
    }
}

#[async_trait]
impl ContextProvider for KnowledgeContextProvider {
    fn name(&self) -> &str {
        "knowledge"
    }

    async fn get_context(&self, query: &str, limit: usize) -> Result<Vec<ContextSnippet>> {
        let items = self
            .engine
            .retrieve_knowledge(
                RetrieveRequest::new(query)
                    .max_results(limit)
                    .min_importance(self.min_importance),
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|item| ContextSnippet {
                source: item.tier.to_string(),
                content: item.content,
                score: item.relevance,
            })
            .collect())
    }
}

/// Serves named resources whose content mentions the query.
///
/// Matching is a case-insensitive substring test; resources are returned in
/// registration order.
pub struct ResourceContextProvider {
    resources: RwLock<Vec<Resource>>,
}

impl ResourceContextProvider {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(Vec::new()),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        let resources = self.resources.get_mut();
        resources.retain(|r| r.name != resource.name);
        resources.push(resource);
        self
    }

    /// Register a resource. A resource with the same name is replaced.
    pub async fn add_resource(&self, resource: Resource) {
        let mut resources = self.resources.write().await;
        resources.retain(|r| r.name != resource.name);
        resources.push(resource);
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.resources.read().await.clone()
    }
}

impl Default for ResourceContextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextProvider for ResourceContextProvider {
    fn name(&self) -> &str {
        "resources"
    }

    async fn get_context(&self, query: &str, limit: usize) -> Result<Vec<ContextSnippet>> {
        let needle = query.to_lowercase();
        let resources = self.resources.read().await;
        Ok(resources
            .iter()
            .filter(|r| r.content.to_lowercase().contains(&needle))
            .take(limit)
            .map(|r| ContextSnippet {
                source: r.name.clone(),
                content: r.content.clone(),
                score: 1.0,
            })
            .collect())
    }
}
