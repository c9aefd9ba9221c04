//! Anthropic Messages API completion provider.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Single user turn per request; text blocks of the reply are concatenated
//!
//! Transport and API failures are folded into the four [`CompletionError`]
//! kinds so callers can report them without knowing about HTTP.

use async_trait::async_trait;
use mastermind_core::error::CompletionError;
use mastermind_core::provider::{Completion, CompletionProvider, CompletionRequest, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn request_body(request: &CompletionRequest) -> MessagesRequest<'_> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
        }
    }

    /// Map a non-success HTTP status to an error kind.
    ///
    /// 429 (rate limited) and 529 (overloaded) are quota conditions; a
    /// gateway timeout is a timeout; everything else is unknown.
    fn classify_status(status: u16, body: &str) -> CompletionError {
        let message = format!("HTTP {status}: {body}");
        match status {
            429 | 529 => CompletionError::Quota(message),
            408 | 504 => CompletionError::Timeout(message),
            _ => CompletionError::Unknown(message),
        }
    }

    fn classify_transport(err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(err.to_string())
        } else {
            CompletionError::Unknown(err.to_string())
        }
    }

    /// Turn a parsed API response into a [`Completion`].
    ///
    /// A reply without any text block is malformed.
    fn response_to_completion(resp: MessagesResponse) -> Result<Completion, CompletionError> {
        let texts: Vec<String> = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect();

        if texts.is_empty() {
            return Err(CompletionError::MalformedResponse(
                "response contained no text content".into(),
            ));
        }

        let usage = resp.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(Completion {
            text: texts.join("\n"),
            model: resp.model,
            usage,
        })
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request);

        debug!(provider = "anthropic", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(Self::classify_status(status, &error_body));
        }

        let raw = response.text().await.map_err(Self::classify_transport)?;
        let api_resp: MessagesResponse = serde_json::from_str(&raw).map_err(|e| {
            CompletionError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Self::response_to_completion(api_resp)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}
