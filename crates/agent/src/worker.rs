//! Worker agent: sends the task straight to a fast model.

use async_trait::async_trait;
use mastermind_core::agent::{Agent, TaskInput, TaskResult};
use mastermind_core::provider::{CompletionProvider, CompletionRequest, DEFAULT_MAX_TOKENS};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct WorkerAgent {
    model: String,
    provider: Arc<dyn CompletionProvider>,
    max_tokens: u32,
    temperature: Option<f32>,
    context: HashMap<String, serde_json::Value>,
}

impl WorkerAgent {
    pub fn new(model: impl Into<String>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            model: model.into(),
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
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

    /// Attach a free-form context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &HashMap<String, serde_json::Value> {
        &self.context
    }
}

#[async_trait]
impl Agent for WorkerAgent {
    fn name(&self) -> &str {
        "worker"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn process(&self, task: &TaskInput) -> TaskResult {
        let mut request =
            CompletionRequest::new(&self.model, task.render()).with_max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(model = %self.model, "Worker processing task");
        match self.provider.complete(request).await {
            Ok(completion) => TaskResult::success(completion.text)
                .with_metadata("model", self.model.clone())
                .with_metadata("agent", "worker"),
            Err(e) => {
                warn!(model = %self.model, kind = e.kind(), error = %e, "Worker completion failed");
                TaskResult::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;
    use mastermind_core::error::CompletionError;

    #[tokio::test]
    async fn success_carries_model_metadata() {
        let provider = Arc::new(SequentialMockProvider::texts(&["analysis done"]));
        let worker = WorkerAgent::new("claude-3-haiku-20240307", provider.clone());

        let result = worker.process(&TaskInput::from("Analyze logs")).await;
        assert!(result.success);
        assert_eq!(result.data, "analysis done");
        assert_eq!(
            result.metadata_value("model"),
            Some(&serde_json::json!("claude-3-haiku-20240307"))
        );
        assert_eq!(result.metadata_value("agent"), Some(&serde_json::json!("worker")));

        let requests = provider.requests();
        assert_eq!(requests[0].prompt, "Analyze logs");
        assert_eq!(requests[0].max_tokens, 1024);
        assert_eq!(requests[0].model, "claude-3-haiku-20240307");
    }

    #[tokio::test]
    async fn failure_is_reported_not_raised() {
        let provider = Arc::new(SequentialMockProvider::failing(CompletionError::Quota(
            "rate limited".into(),
        )));
        let worker = WorkerAgent::new("m", provider);

        let result = worker.process(&TaskInput::from("x")).await;
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(result.error.unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn structured_task_is_rendered() {
        let provider = Arc::new(SequentialMockProvider::texts(&["ok"]));
        let worker = WorkerAgent::new("m", provider.clone());
        worker
            .process(&TaskInput::from(serde_json::json!({"goal": "ship"})))
            .await;
        assert!(provider.requests()[0].prompt.contains("\"goal\": \"ship\""));
    }

    #[test]
    fn context_map() {
        let worker = WorkerAgent::new("m", Arc::new(SequentialMockProvider::texts(&[])))
            .with_context("team", "infra");
        assert_eq!(worker.context()["team"], "infra");
    }
}
