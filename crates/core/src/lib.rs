//! # Mastermind Core
//!
//! Domain types, traits, and error definitions for the Mastermind agent
//! orchestrator. This crate has **no framework dependencies**: it defines
//! the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`CompletionProvider`] turns a prompt into text
//! - [`Embedder`] turns text into a fixed-length vector
//! - [`RecordStore`] persists knowledge items, one collection per tier
//! - [`ContextProvider`] supplies extra context to agents that want it
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins without touching the pipeline.

pub mod agent;
pub mod context;
pub mod error;
pub mod knowledge;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, ModelTier, TaskInput, TaskResult};
pub use context::{ContextProvider, ContextSnippet, Resource};
pub use error::{CompletionError, EmbeddingError, Error, Result, StoreError, ToolError};
pub use knowledge::{KnowledgeItem, RecordFilter, RecordStore, RecordUpdate, Tier};
pub use provider::{Completion, CompletionProvider, CompletionRequest, Embedder, Usage};
pub use tool::{Tool, ToolName, ToolOutput, ToolRegistry};
