//! Tool trait and the typed tool registry.
//!
//! Tools are keyed by [`ToolName`], a closed enumeration. A name arriving as
//! a string is validated before lookup, so an unknown tool is a validation
//! error rather than a missing-entry surprise at call time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result, ToolError};

/// Every tool the runtime knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ReadFile,
    WriteFile,
    KnowledgeSearch,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::KnowledgeSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::KnowledgeSearch => "knowledge_search",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown tool '{s}'")))
    }
}

/// The result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool did what was asked
    pub success: bool,

    /// Human-readable output
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(&self, params: serde_json::Value) -> std::result::Result<ToolOutput, ToolError>;
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.tools.get(&name).map(|t| t.as_ref())
    }

    pub async fn invoke(
        &self,
        name: ToolName,
        params: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(&name)
            .ok_or_else(|| ToolError::NotRegistered(name.to_string()))?;
        tool.invoke(params).await
    }

    /// Validate `name`, then invoke.
    pub async fn invoke_by_name(&self, name: &str, params: serde_json::Value) -> Result<ToolOutput> {
        let name: ToolName = name.parse()?;
        Ok(self.invoke(name, params).await?)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<ToolName> {
        let mut names: Vec<ToolName> = self.tools.keys().copied().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
