//! Embedding providers.
//!
//! - [`HashEmbedder`]: local, deterministic feature hashing. No network, no
//!   model download; similar wording yields similar vectors.
//! - [`OpenAiEmbedder`]: any OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use mastermind_core::error::EmbeddingError;
use mastermind_core::provider::Embedder;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_DIMENSIONS: usize = 384;

/// Feature-hashing embedder over word unigrams and bigrams.
///
/// Output is L2-normalised, so cosine similarity reduces to a dot product.
/// Text with no alphanumeric tokens embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Synchronous core of [`Embedder::embed`].
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = Self::tokens(text);

        let mut add = |feature: &str, weight: f32| {
            let hash = fnv1a(feature.as_bytes());
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign * weight;
        };

        for token in &tokens {
            add(token, 1.0);
        }
        for pair in tokens.windows(2) {
            add(&format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

/// 64-bit FNV-1a. Stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_text(text))
    }
}

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: DEFAULT_OPENAI_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
            "dimensions": self.dimensions,
        })
    }

    fn extract(&self, resp: EmbeddingApiResponse) -> Result<Vec<f32>, EmbeddingError> {
        let embedding = resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Failed("response contained no embeddings".into()))?;

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);

        debug!(provider = "openai", model = %self.model, "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Embedding API error");
            return Err(EmbeddingError::Failed(format!("HTTP {status}: {error_body}")));
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("Failed to parse embedding response: {e}")))?;

        self.extract(api_resp)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
