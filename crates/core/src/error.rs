//! Error types for the Mastermind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; [`Error`] wraps them.

use thiserror::Error;

/// The top-level error type for all Mastermind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- External services ---
    #[error("Completion service error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for building a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the failure came from the completion service, the embedding
    /// service or the record store.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Completion(_) | Self::Embedding(_) | Self::Store(_)
        )
    }

    /// True for rejected input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Tool(ToolError::InvalidArguments(_)))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

/// Failures of the completion service, folded into four kinds regardless of
/// which provider produced them.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Completion failed: {0}")]
    Unknown(String),
}

impl CompletionError {
    /// Short machine-readable kind, used in logs and result metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Quota(_) => "quota",
            Self::Timeout(_) => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding generation failed: {0}")]
    Failed(String),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not registered: {0}")]
    NotRegistered(String),

    #[error("Tool execution failed: {tool_name} ({reason})")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Permission denied: {tool_name} ({reason})")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
