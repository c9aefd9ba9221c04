//! `read_file` — read a file from the workspace.

use async_trait::async_trait;
use mastermind_core::error::ToolError;
use mastermind_core::tool::{Tool, ToolName, ToolOutput};
use std::sync::Arc;

use crate::workspace::{PathError, Workspace};

pub struct ReadFileTool {
    workspace: Arc<Workspace>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

/// Map a path rejection to the tool error taxonomy.
pub(crate) fn path_error(tool: ToolName, err: PathError) -> ToolError {
    match err {
        PathError::Empty => ToolError::InvalidArguments(err.to_string()),
        _ => ToolError::PermissionDenied {
            tool_name: tool.to_string(),
            reason: err.to_string(),
        },
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> ToolName {
        ToolName::ReadFile
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                }
            },
            "required": ["path"]
        })
    }

    async fn invoke(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = params["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| path_error(ToolName::ReadFile, e))?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => {
                let bytes = content.len();
                Ok(ToolOutput::ok(content).with_data(serde_json::json!({
                    "path": path,
                    "bytes": bytes,
                })))
            }
            Err(e) => Ok(ToolOutput::failed(format!("Failed to read file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> (tempfile::TempDir, ReadFileTool) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, ReadFileTool::new(Arc::new(ws)))
    }

    #[test]
    fn tool_definition() {
        let (_dir, tool) = tool();
        assert_eq!(tool.name(), ToolName::ReadFile);
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path"]));
    }

    #[tokio::test]
    async fn read_existing_file() {
        let (dir, tool) = tool();
        std::fs::write(dir.path().join("test.txt"), "Hello, world!").unwrap();

        let output = tool
            .invoke(serde_json::json!({ "path": "test.txt" }))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.output, "Hello, world!");
        assert_eq!(output.data.unwrap()["bytes"], 13);
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let (_dir, tool) = tool();
        let output = tool
            .invoke(serde_json::json!({ "path": "missing.txt" }))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.output.contains("Failed to read file"));
    }

    #[tokio::test]
    async fn missing_path_argument() {
        let (_dir, tool) = tool();
        let err = tool.invoke(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn path_traversal_blocked() {
        let (_dir, tool) = tool();
        let err = tool
            .invoke(serde_json::json!({ "path": "../../etc/passwd" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }
}
