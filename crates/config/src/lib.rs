//! Configuration loading, validation, and management for Mastermind.
//!
//! Loads configuration from `~/.mastermind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use mastermind_core::ModelTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mastermind/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifiers per tier and request defaults
    #[serde(default)]
    pub models: ModelsConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// HTTP surface configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool workspace configuration
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("models", &self.models)
            .field("memory", &self.memory)
            .field("embedding", &self.embedding)
            .field("orchestrator", &self.orchestrator)
            .field("gateway", &self.gateway)
            .field("workspace", &self.workspace)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Worker model
    #[serde(default = "default_fast_model")]
    pub fast: String,

    /// Strategist model
    #[serde(default = "default_strategist_model")]
    pub strategist: String,

    /// Direct chat model
    #[serde(default = "default_premium_model")]
    pub premium: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Override the provider base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_fast_model() -> String {
    "claude-3-haiku-20240307".into()
}
fn default_strategist_model() -> String {
    "claude-3-5-sonnet-20240620".into()
}
fn default_premium_model() -> String {
    "claude-3-opus-20240229".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    120
}

impl ModelsConfig {
    /// The configured model identifier for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::HighCapability => &self.strategist,
            ModelTier::Premium => &self.premium,
        }
    }

    /// Resolve a caller-chosen model: a tier name or alias ("fast",
    /// "opus", ...) or one of the configured identifiers.
    pub fn resolve(&self, requested: &str) -> Result<&str, mastermind_core::Error> {
        if let Ok(tier) = requested.parse::<ModelTier>() {
            return Ok(self.model_for(tier));
        }
        [&self.fast, &self.strategist, &self.premium]
            .into_iter()
            .find(|model| model.as_str() == requested.trim())
            .map(String::as_str)
            .ok_or_else(|| mastermind_core::Error::validation(format!("invalid model '{requested}'")))
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            strategist: default_strategist_model(),
            premium: default_premium_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "sqlite" or "in_memory"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// SQLite database path (defaults to `~/.mastermind/knowledge.sqlite`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Items above this importance go to long-term memory
    #[serde(default = "default_routing_threshold")]
    pub routing_threshold: f32,

    #[serde(default = "default_short_term_threshold")]
    pub short_term_threshold: f32,

    #[serde(default = "default_long_term_threshold")]
    pub long_term_threshold: f32,

    #[serde(default = "default_min_importance")]
    pub default_min_importance: f32,

    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Seconds between background cleanups (0 = disabled)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Importance assigned to stored pipeline results
    #[serde(default = "default_task_result_importance")]
    pub task_result_importance: f32,

    /// Importance assigned to stored chat responses
    #[serde(default = "default_chat_response_importance")]
    pub chat_response_importance: f32,

    /// Importance assigned to stored generated code
    #[serde(default = "default_code_importance")]
    pub code_importance: f32,

    /// Importance assigned to stored message responses
    #[serde(default = "default_message_response_importance")]
    pub message_response_importance: f32,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}
fn default_routing_threshold() -> f32 {
    0.7
}
fn default_short_term_threshold() -> f32 {
    0.2
}
fn default_long_term_threshold() -> f32 {
    0.5
}
fn default_min_importance() -> f32 {
    0.3
}
fn default_max_results() -> usize {
    5
}
fn default_cleanup_interval() -> u64 {
    3600
}
fn default_task_result_importance() -> f32 {
    0.5
}
fn default_chat_response_importance() -> f32 {
    0.6
}
fn default_code_importance() -> f32 {
    0.7
}
fn default_message_response_importance() -> f32 {
    0.5
}

impl MemoryConfig {
    /// Resolved SQLite path.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("knowledge.sqlite"))
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
            routing_threshold: default_routing_threshold(),
            short_term_threshold: default_short_term_threshold(),
            long_term_threshold: default_long_term_threshold(),
            default_min_importance: default_min_importance(),
            default_max_results: default_max_results(),
            cleanup_interval_secs: default_cleanup_interval(),
            task_result_importance: default_task_result_importance(),
            chat_response_importance: default_chat_response_importance(),
            code_importance: default_code_importance(),
            message_response_importance: default_message_response_importance(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hash" (local, deterministic) or "openai"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_provider() -> String {
    "hash".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimensions() -> usize {
    384
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            api_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of workers created at startup
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Let the strategist pull context from the knowledge store
    #[serde(default = "default_true")]
    pub strategist_uses_knowledge: bool,

    /// Snippets fetched per strategist call
    #[serde(default = "default_context_snippets")]
    pub context_snippets: usize,

    /// Persist successful pipeline results
    #[serde(default = "default_true")]
    pub store_results: bool,
}

fn default_workers() -> usize {
    2
}
fn default_context_snippets() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strategist_uses_knowledge: true,
            context_snippets: default_context_snippets(),
            store_results: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins; empty = any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory for file tools (defaults to `~/.mastermind/workspace`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.mastermind/config.toml).
    ///
    /// Environment overrides:
    /// - `MASTERMIND_API_KEY`, then `ANTHROPIC_API_KEY` (when no key is configured)
    /// - `MASTERMIND_FAST_MODEL`, `MASTERMIND_STRATEGIST_MODEL`
    /// - `MASTERMIND_DB_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("MASTERMIND_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .filter(|k| !k.is_empty());
        }
        if let Ok(model) = std::env::var("MASTERMIND_FAST_MODEL") {
            self.models.fast = model;
        }
        if let Ok(model) = std::env::var("MASTERMIND_STRATEGIST_MODEL") {
            self.models.strategist = model;
        }
        if let Ok(path) = std::env::var("MASTERMIND_DB_PATH") {
            self.memory.path = Some(path);
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mastermind")
    }

    /// Root directory for file tools.
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace
            .root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("workspace"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.models.temperature < 0.0 || self.models.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "models.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let unit_fields = [
            ("memory.routing_threshold", self.memory.routing_threshold),
            ("memory.short_term_threshold", self.memory.short_term_threshold),
            ("memory.long_term_threshold", self.memory.long_term_threshold),
            ("memory.default_min_importance", self.memory.default_min_importance),
            ("memory.task_result_importance", self.memory.task_result_importance),
            ("memory.chat_response_importance", self.memory.chat_response_importance),
            ("memory.code_importance", self.memory.code_importance),
            (
                "memory.message_response_importance",
                self.memory.message_response_importance,
            ),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0 (got {value})"
                )));
            }
        }

        if !matches!(self.memory.backend.as_str(), "sqlite" | "in_memory") {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be 'sqlite' or 'in_memory' (got '{}')",
                self.memory.backend
            )));
        }

        if !matches!(self.embedding.provider.as_str(), "hash" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "embedding.provider must be 'hash' or 'openai' (got '{}')",
                self.embedding.provider
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be > 0".into(),
            ));
        }

        if self.orchestrator.workers == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.workers must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            models: ModelsConfig::default(),
            memory: MemoryConfig::default(),
            embedding: EmbeddingConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            gateway: GatewayConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
