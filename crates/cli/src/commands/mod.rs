//! Subcommand implementations and the helpers they share.

pub mod config_cmd;
pub mod init;
pub mod memory;
pub mod serve;
pub mod task;
pub mod tools;

use mastermind_config::AppConfig;
use mastermind_memory::KnowledgeEngine;
use std::sync::Arc;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the configured store with the configured embedder.
pub(crate) async fn open_engine(
    config: &AppConfig,
) -> Result<Arc<KnowledgeEngine>, Box<dyn std::error::Error>> {
    let embedder = mastermind_providers::build_embedder(config)?;
    let engine = mastermind_agent::open_knowledge_engine(config, embedder).await?;
    Ok(Arc::new(engine))
}

/// First `max` characters of `text` on one line.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo…");
        assert_eq!(preview("a\nb", 10), "a b");
    }
}
