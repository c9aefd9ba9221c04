//! Shared test helpers for agent and orchestrator tests.

use async_trait::async_trait;
use mastermind_core::error::{CompletionError, EmbeddingError};
use mastermind_core::provider::{Completion, CompletionProvider, CompletionRequest, Embedder, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted outcomes.
///
/// Each call to `complete` pops the next outcome and records the request.
/// Once the script runs out every call fails with `Unknown`.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful responses, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// A provider whose first call fails with `err`.
    pub fn failing(err: CompletionError) -> Self {
        Self::new(vec![Err(err)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Unknown("script exhausted".into())));

        next.map(|text| Completion {
            text,
            model,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Embeds every text to the same vector.
pub struct FlatEmbedder;

#[async_trait]
impl Embedder for FlatEmbedder {
    fn name(&self) -> &str {
        "flat"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0, 0.0])
    }
}
