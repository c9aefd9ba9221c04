//! Agent capability and the task result envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Which class of model an agent talks to.
///
/// The concrete model identifiers come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Fast, cheap model used by workers
    Fast,
    /// Higher-capability model used by the strategist
    HighCapability,
    /// Largest model, used for direct chat
    Premium,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::HighCapability => "high_capability",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "haiku" => Ok(Self::Fast),
            "high_capability" | "sonnet" => Ok(Self::HighCapability),
            "premium" | "opus" => Ok(Self::Premium),
            other => Err(Error::validation(format!("unknown model tier '{other}'"))),
        }
    }
}

/// A task handed to an agent: free text or an arbitrary JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskInput {
    Text(String),
    Structured(serde_json::Value),
}

impl TaskInput {
    /// Stringify the task for the completion service.
    ///
    /// Text passes through unchanged; JSON strings are unwrapped; anything
    /// else is pretty-printed.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(serde_json::Value::String(text)) => text.clone(),
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<&str> for TaskInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TaskInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<serde_json::Value> for TaskInput {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

/// The outcome of every `process` call.
///
/// Built only through [`TaskResult::success`] and [`TaskResult::failure`], so
/// a successful result never carries an error and a failed one never
/// carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,

    #[serde(default)]
    pub data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TaskResult {
    pub fn success(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
            metadata: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: String::new(),
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// Attach a metadata entry, creating the map on first use.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert_metadata(key, value);
        self
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

/// A unit of work backed by a language model.
///
/// `process` is the fault-isolation boundary for model calls: every failure
/// comes back as a failed [`TaskResult`], never as a panic or `Err`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role name for logs and metadata (e.g., "worker", "strategist").
    fn name(&self) -> &str;

    /// The model identifier this agent sends requests to.
    fn model(&self) -> &str;

    async fn process(&self, task: &TaskInput) -> TaskResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_error() {
        let result = TaskResult::success("done");
        assert!(result.success);
        assert_eq!(result.data, "done");
        assert!(result.error.is_none());
        assert!(result.metadata.is_none());
    }

    #[test]
    fn failure_has_zero_data() {
        let result = TaskResult::failure("quota exceeded");
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn metadata_accumulates() {
        let result = TaskResult::success("x")
            .with_metadata("model", "haiku")
            .with_metadata("workers", 2);
        assert_eq!(result.metadata_value("model"), Some(&serde_json::json!("haiku")));
        assert_eq!(result.metadata_value("workers"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn task_input_render() {
        assert_eq!(TaskInput::from("plain").render(), "plain");
        assert_eq!(
            TaskInput::from(serde_json::json!("wrapped")).render(),
            "wrapped"
        );
        let structured = TaskInput::from(serde_json::json!({"original_task": "t"}));
        assert!(structured.render().contains("\"original_task\": \"t\""));
    }

    #[test]
    fn task_input_untagged_deserialization() {
        let text: TaskInput = serde_json::from_str(r#""analyze this""#).unwrap();
        assert_eq!(text, TaskInput::Text("analyze this".into()));

        let structured: TaskInput = serde_json::from_str(r#"{"goal":"x"}"#).unwrap();
        assert!(matches!(structured, TaskInput::Structured(_)));
    }

    #[test]
    fn model_tier_parsing() {
        assert_eq!("haiku".parse::<ModelTier>().unwrap(), ModelTier::Fast);
        assert_eq!("Sonnet".parse::<ModelTier>().unwrap(), ModelTier::HighCapability);
        assert_eq!("premium".parse::<ModelTier>().unwrap(), ModelTier::Premium);
        assert!("gigantic".parse::<ModelTier>().is_err());
    }
}
