//! Strategist agent: plans a task and later synthesizes worker output.
//!
//! Every task is wrapped in a four-part analysis template. With a
//! [`ContextProvider`] attached, relevant snippets are prepended first.

use async_trait::async_trait;
use mastermind_core::agent::{Agent, TaskInput, TaskResult};
use mastermind_core::context::{ContextProvider, ContextSnippet};
use mastermind_core::provider::{CompletionProvider, CompletionRequest, DEFAULT_MAX_TOKENS};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_CONTEXT_LIMIT: usize = 3;

/// Wrap `task` in the analysis template, with optional context first.
pub fn strategy_prompt(task: &str, context: &[ContextSnippet]) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str("Relevant context:\n");
        for snippet in context {
            prompt.push_str(&format!("- [{}] {}\n", snippet.source, snippet.content));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "Task Analysis Required:\n{task}\n\n\
         Please provide:\n\
         1. Task decomposition\n\
         2. Strategic approach\n\
         3. Potential challenges\n\
         4. Recommended solution path"
    ));
    prompt
}

pub struct StrategistAgent {
    model: String,
    provider: Arc<dyn CompletionProvider>,
    max_tokens: u32,
    temperature: Option<f32>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    context_limit: usize,
    context: HashMap<String, serde_json::Value>,
}

impl StrategistAgent {
    pub fn new(model: impl Into<String>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            model: model.into(),
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            context_provider: None,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            context: HashMap::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Pull up to `limit` snippets from `provider` for every task.
    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>, limit: usize) -> Self {
        self.context_provider = Some(provider);
        self.context_limit = limit;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &HashMap<String, serde_json::Value> {
        &self.context
    }

    async fn fetch_context(&self, task: &str) -> Vec<ContextSnippet> {
        let Some(ref provider) = self.context_provider else {
            return Vec::new();
        };
        match provider.get_context(task, self.context_limit).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Context lookup failed, continuing without it");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Agent for StrategistAgent {
    fn name(&self) -> &str {
        "strategist"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn process(&self, task: &TaskInput) -> TaskResult {
        let rendered = task.render();
        let context = self.fetch_context(&rendered).await;
        let prompt = strategy_prompt(&rendered, &context);

        let mut request = CompletionRequest::new(&self.model, prompt).with_max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(model = %self.model, context_snippets = context.len(), "Strategist processing task");
        match self.provider.complete(request).await {
            Ok(completion) => TaskResult::success(completion.text)
                .with_metadata("model", self.model.clone())
                .with_metadata("agent", "strategist"),
            Err(e) => {
                warn!(model = %self.model, kind = e.kind(), error = %e, "Strategist completion failed");
                TaskResult::failure(e.to_string())
            }
        }
    }
}
