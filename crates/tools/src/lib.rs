//! Built-in tools for Mastermind.
//!
//! - `read_file` / `write_file`: confined to a workspace directory
//! - `knowledge_search`: ranked search over the knowledge store

pub mod file_read;
pub mod file_write;
pub mod knowledge_search;
pub mod workspace;

use mastermind_core::tool::ToolRegistry;
use mastermind_memory::KnowledgeEngine;
use std::sync::Arc;

pub use file_read::ReadFileTool;
pub use file_write::WriteFileTool;
pub use knowledge_search::KnowledgeSearchTool;
pub use workspace::{PathError, Workspace};

/// Create a registry with every built-in tool.
pub fn default_registry(workspace: Arc<Workspace>, engine: Arc<KnowledgeEngine>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadFileTool::new(workspace.clone())));
    registry.register(Box::new(WriteFileTool::new(workspace)));
    registry.register(Box::new(KnowledgeSearchTool::new(engine)));
    registry
}
