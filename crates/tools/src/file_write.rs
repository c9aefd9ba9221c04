//! `write_file` — create or overwrite a file in the workspace.

use async_trait::async_trait;
use mastermind_core::error::ToolError;
use mastermind_core::tool::{Tool, ToolName, ToolOutput};
use std::sync::Arc;
use tracing::info;

use crate::file_read::path_error;
use crate::workspace::Workspace;

pub struct WriteFileTool {
    workspace: Arc<Workspace>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> ToolName {
        ToolName::WriteFile
    }

    fn description(&self) -> &str {
        "Write content to a file in the workspace. Creates the file (and parent \
         directories) if missing, overwrites it otherwise."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn invoke(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = params["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = params["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| path_error(ToolName::WriteFile, e))?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolOutput::failed(format!("Failed to create directories: {e}")));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => {
                info!(path, bytes = content.len(), "File written");
                Ok(ToolOutput::ok(format!(
                    "Successfully wrote {} bytes to {path}",
                    content.len()
                )))
            }
            Err(e) => Ok(ToolOutput::failed(format!("Failed to write file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> (tempfile::TempDir, WriteFileTool) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, WriteFileTool::new(Arc::new(ws)))
    }

    #[tokio::test]
    async fn write_new_file_with_parents() {
        let (dir, tool) = tool();
        let output = tool
            .invoke(serde_json::json!({ "path": "out/nested/a.txt", "content": "hello" }))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/nested/a.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn overwrite_existing_file() {
        let (dir, tool) = tool();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        tool.invoke(serde_json::json!({ "path": "a.txt", "content": "new" }))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn missing_content_argument() {
        let (_dir, tool) = tool();
        let err = tool
            .invoke(serde_json::json!({ "path": "a.txt" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn escape_blocked() {
        let (dir, tool) = tool();
        let outside = dir.path().parent().unwrap().join("escaped.txt");
        let err = tool
            .invoke(serde_json::json!({ "path": outside.to_str().unwrap(), "content": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
        assert!(!outside.exists());
    }
}
