//! Completion and embedding providers for Mastermind.
//!
//! Providers implement `mastermind_core::CompletionProvider` and
//! `mastermind_core::Embedder`. The router builds them from configuration.

pub mod anthropic;
pub mod embedding;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use embedding::{HashEmbedder, OpenAiEmbedder};
pub use router::{build_completion_provider, build_embedder};
