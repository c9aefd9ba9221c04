//! `knowledge_search` — query the tiered knowledge store on demand.

use async_trait::async_trait;
use mastermind_core::error::ToolError;
use mastermind_core::tool::{Tool, ToolName, ToolOutput};
use mastermind_memory::{KnowledgeEngine, RetrieveRequest};
use std::sync::Arc;

const MAX_LIMIT: u64 = 50;

pub struct KnowledgeSearchTool {
    engine: Arc<KnowledgeEngine>,
}

impl KnowledgeSearchTool {
    pub fn new(engine: Arc<KnowledgeEngine>) -> Self {
        Self { engine }
    }
}

#[derive(serde::Serialize)]
struct SearchHit {
    id: String,
    content: String,
    category: String,
    tier: String,
    importance: f32,
    relevance: f32,
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> ToolName {
        ToolName::KnowledgeSearch
    }

    fn description(&self) -> &str {
        "Search stored knowledge across short-term, long-term and context memory. \
         Results are ranked by importance, then relevance to the query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (default 5)",
                    "default": 5
                },
                "min_importance": {
                    "type": "number",
                    "description": "Ignore items below this importance (default 0.3)",
                    "default": 0.3
                },
                "category": {
                    "type": "string",
                    "description": "Only return items of this category"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let mut request = RetrieveRequest::new(query)
            .max_results(params["limit"].as_u64().unwrap_or(5).min(MAX_LIMIT) as usize);
        if let Some(min) = params["min_importance"].as_f64() {
            request = request.min_importance(min as f32);
        }
        if let Some(category) = params["category"].as_str() {
            request = request.category(category);
        }

        let items = match self.engine.retrieve_knowledge(request).await {
            Ok(items) => items,
            Err(e) => return Ok(ToolOutput::failed(format!("Knowledge search failed: {e}"))),
        };

        let hits: Vec<SearchHit> = items
            .into_iter()
            .map(|item| SearchHit {
                id: item.id,
                content: item.content,
                category: item.category,
                tier: item.tier.to_string(),
                importance: item.importance,
                relevance: item.relevance,
            })
            .collect();

        let output = if hits.is_empty() {
            format!("No knowledge found matching '{query}'.")
        } else {
            hits.iter()
                .enumerate()
                .map(|(i, hit)| {
                    format!(
                        "{}. [{} | importance {:.2}] {}",
                        i + 1,
                        hit.tier,
                        hit.importance,
                        hit.content
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let data = serde_json::to_value(&hits).map_err(|e| ToolError::ExecutionFailed {
            tool_name: ToolName::KnowledgeSearch.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ToolOutput::ok(output).with_data(data))
    }
}
