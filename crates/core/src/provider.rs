//! Provider traits — the abstraction over language-model backends.
//!
//! A [`CompletionProvider`] sends one prompt to a model and returns the
//! generated text. An [`Embedder`] turns text into a vector for similarity
//! ranking. Agents and the knowledge engine only ever see these traits.
//!
//! Implementations: Anthropic Messages API, OpenAI-compatible embeddings,
//! a deterministic local hashing embedder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, EmbeddingError};

/// Maximum tokens requested when the caller does not say otherwise.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A single request/response completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "claude-3-haiku-20240307")
    pub model: String,

    /// The full prompt text
    pub prompt: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: default_temperature(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The completion capability.
///
/// Every backend maps its own failures into [`CompletionError`]'s four kinds
/// so callers never branch on provider-specific errors.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> Result<bool, CompletionError> {
        Ok(true)
    }
}

/// The embedding capability. Deterministic for a given model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name (e.g., "hash", "openai").
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_defaults() {
        let req = CompletionRequest::new("claude-3-haiku", "hello");
        assert_eq!(req.max_tokens, 1024);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn completion_request_deserializes_with_defaults() {
        let req: CompletionRequest =
            serde_json::from_str(r#"{"model":"m","prompt":"p"}"#).unwrap();
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn completion_request_builders() {
        let req = CompletionRequest::new("m", "p")
            .with_max_tokens(64)
            .with_temperature(0.0);
        assert_eq!(req.max_tokens, 64);
        assert_eq!(req.temperature, 0.0);
    }
}
