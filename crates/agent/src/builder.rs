//! Wiring agents and the knowledge engine from configuration.

use mastermind_config::{AppConfig, MemoryConfig};
use mastermind_core::agent::Agent;
use mastermind_core::error::StoreError;
use mastermind_core::knowledge::RecordStore;
use mastermind_core::provider::{CompletionProvider, Embedder};
use mastermind_memory::{InMemoryRecordStore, KnowledgeEngine, KnowledgePolicy, SqliteRecordStore};
use std::sync::Arc;
use tracing::info;

use crate::context_providers::KnowledgeContextProvider;
use crate::orchestrator::Orchestrator;
use crate::strategist::StrategistAgent;
use crate::worker::WorkerAgent;

pub fn knowledge_policy(memory: &MemoryConfig) -> KnowledgePolicy {
    KnowledgePolicy {
        routing_threshold: memory.routing_threshold,
        short_term_threshold: Some(memory.short_term_threshold),
        long_term_threshold: Some(memory.long_term_threshold),
    }
}

/// Open the configured record store and build an engine on top of it.
pub async fn open_knowledge_engine(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<KnowledgeEngine, StoreError> {
    let store: Arc<dyn RecordStore> = match config.memory.backend.as_str() {
        "in_memory" => Arc::new(InMemoryRecordStore::new()),
        _ => {
            let path = config.memory.database_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            Arc::new(SqliteRecordStore::new(&path.to_string_lossy()).await?)
        }
    };
    info!(backend = %config.memory.backend, embedder = embedder.name(), "Knowledge engine ready");
    Ok(KnowledgeEngine::with_policy(
        store,
        embedder,
        knowledge_policy(&config.memory),
    ))
}

/// Build the strategist and the worker pool.
///
/// `knowledge` feeds the strategist's context (when enabled) and receives
/// pipeline results (when `orchestrator.store_results` is set).
pub fn build_orchestrator(
    config: &AppConfig,
    provider: Arc<dyn CompletionProvider>,
    knowledge: Option<Arc<KnowledgeEngine>>,
) -> Orchestrator {
    let models = &config.models;

    let mut strategist = StrategistAgent::new(&models.strategist, provider.clone())
        .with_max_tokens(models.max_tokens)
        .with_temperature(models.temperature);
    if config.orchestrator.strategist_uses_knowledge
        && let Some(ref engine) = knowledge
    {
        let context = KnowledgeContextProvider::new(engine.clone())
            .with_min_importance(config.memory.default_min_importance);
        strategist =
            strategist.with_context_provider(Arc::new(context), config.orchestrator.context_snippets);
    }

    let mut orchestrator = Orchestrator::new(Arc::new(strategist));
    for _ in 0..config.orchestrator.workers {
        let worker: Arc<dyn Agent> = Arc::new(
            WorkerAgent::new(&models.fast, provider.clone())
                .with_max_tokens(models.max_tokens)
                .with_temperature(models.temperature),
        );
        orchestrator.add_worker(worker);
    }

    if config.orchestrator.store_results
        && let Some(engine) = knowledge
    {
        orchestrator = orchestrator.with_knowledge(engine, config.memory.task_result_importance);
    }
    orchestrator
}
