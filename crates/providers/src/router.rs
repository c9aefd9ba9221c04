//! Builds the configured completion provider and embedder.
//!
//! The composing layer (CLI or gateway) calls these once at startup and
//! shares the resulting handles.

use std::sync::Arc;
use std::time::Duration;

use mastermind_config::{AppConfig, ConfigError};
use mastermind_core::provider::{CompletionProvider, Embedder};
use tracing::{info, warn};

use crate::anthropic::AnthropicProvider;
use crate::embedding::{HashEmbedder, OpenAiEmbedder};

/// Build the Anthropic provider from config.
///
/// A missing API key is not fatal here: the provider is still built and
/// every completion will fail with an upstream authentication error.
pub fn build_completion_provider(config: &AppConfig) -> Arc<dyn CompletionProvider> {
    let api_key = config.api_key.clone().unwrap_or_else(|| {
        warn!("No API key configured; completions will fail");
        String::new()
    });

    let mut provider = AnthropicProvider::new(api_key)
        .with_timeout(Duration::from_secs(config.models.timeout_secs));
    if let Some(ref url) = config.models.api_url {
        provider = provider.with_base_url(url);
    }

    info!(
        fast = %config.models.fast,
        strategist = %config.models.strategist,
        premium = %config.models.premium,
        "Completion provider ready"
    );
    Arc::new(provider)
}

/// Build the configured embedder.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    let embedding = &config.embedding;
    match embedding.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(embedding.dimensions))),
        "openai" => {
            let api_key = embedding.api_key.clone().ok_or_else(|| {
                ConfigError::ValidationError(
                    "embedding.provider = 'openai' requires embedding.api_key or OPENAI_API_KEY"
                        .into(),
                )
            })?;
            let mut embedder =
                OpenAiEmbedder::new(api_key, &embedding.model, embedding.dimensions);
            if let Some(ref url) = embedding.api_url {
                embedder = embedder.with_base_url(url);
            }
            Ok(Arc::new(embedder))
        }
        other => Err(ConfigError::ValidationError(format!(
            "unknown embedding provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_embedder_is_hash() {
        let embedder = build_embedder(&AppConfig::default()).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let mut config = AppConfig::default();
        config.embedding.provider = "openai".into();
        config.embedding.api_key = None;
        assert!(build_embedder(&config).is_err());
    }

    #[test]
    fn openai_with_key() {
        let mut config = AppConfig::default();
        config.embedding.provider = "openai".into();
        config.embedding.api_key = Some("sk-test".into());
        config.embedding.dimensions = 256;
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "openai");
        assert_eq!(embedder.dimensions(), 256);
    }

    #[test]
    fn completion_provider_without_key_still_builds() {
        let provider = build_completion_provider(&AppConfig::default());
        assert_eq!(provider.name(), "anthropic");
    }
}
