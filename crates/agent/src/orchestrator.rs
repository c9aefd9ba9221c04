//! The orchestration pipeline.
//!
//! ```text
//!   task ──▶ Strategist ──▶ strategy ──┬──▶ Worker 1 ──┐
//!                                      ├──▶ Worker 2 ──┼──▶ Strategist ──▶ result
//!                                      └──▶ Worker N ──┘    (synthesis)
//! ```
//!
//! A failed strategy aborts the run before any worker is dispatched. Worker
//! failures never abort: each one shows up as a failed entry at that
//! worker's position in the synthesis input.
//!
//! Every agent call runs on its own tokio task, so a panicking agent turns
//! into a failed [`TaskResult`] instead of unwinding into the caller.

use futures::future::join_all;
use mastermind_core::agent::{Agent, TaskInput, TaskResult};
use mastermind_memory::{KnowledgeEngine, StoreRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_RESULT_IMPORTANCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Strategizing,
    Dispatching,
    Gathering,
    Synthesizing,
    Done,
    Aborted,
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// The pipeline result (synthesis, or the failed strategy)
    pub result: TaskResult,
    /// Stages visited, in order
    pub stages: Vec<PipelineStage>,
    pub strategy: TaskResult,
    /// One entry per worker, in dispatch order
    pub worker_results: Vec<TaskResult>,
}

impl PipelineRun {
    pub fn final_stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Idle)
    }
}

struct StageLog(Vec<PipelineStage>);

impl StageLog {
    fn new() -> Self {
        Self(vec![PipelineStage::Idle])
    }

    fn advance(&mut self, stage: PipelineStage) {
        info!(?stage, "Pipeline stage");
        self.0.push(stage);
    }
}

pub struct Orchestrator {
    strategist: Arc<dyn Agent>,
    workers: Vec<Arc<dyn Agent>>,
    knowledge: Option<Arc<KnowledgeEngine>>,
    result_importance: f32,
}

impl Orchestrator {
    pub fn new(strategist: Arc<dyn Agent>) -> Self {
        Self {
            strategist,
            workers: Vec::new(),
            knowledge: None,
            result_importance: DEFAULT_RESULT_IMPORTANCE,
        }
    }

    pub fn with_worker(mut self, worker: Arc<dyn Agent>) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn add_worker(&mut self, worker: Arc<dyn Agent>) {
        self.workers.push(worker);
    }

    /// Persist successful results as `task_result` knowledge.
    pub fn with_knowledge(mut self, engine: Arc<KnowledgeEngine>, importance: f32) -> Self {
        self.knowledge = Some(engine);
        self.result_importance = importance;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn process_task(&self, task: &TaskInput) -> TaskResult {
        self.process_task_traced(task).await.result
    }

    /// Run the pipeline and keep the intermediate results.
    pub async fn process_task_traced(&self, task: &TaskInput) -> PipelineRun {
        let mut stages = StageLog::new();

        stages.advance(PipelineStage::Strategizing);
        let strategy = run_strategist(&self.strategist, task.clone()).await;
        if !strategy.success {
            warn!(error = ?strategy.error, "Strategy failed, aborting pipeline");
            stages.advance(PipelineStage::Aborted);
            return PipelineRun {
                result: strategy.clone(),
                stages: stages.0,
                strategy,
                worker_results: Vec::new(),
            };
        }

        stages.advance(PipelineStage::Dispatching);
        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                let input = TaskInput::Text(strategy.data.clone());
                tokio::spawn(async move { worker.process(&input).await })
            })
            .collect();

        stages.advance(PipelineStage::Gathering);
        let worker_results: Vec<TaskResult> = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| {
                joined.unwrap_or_else(|e| {
                    warn!(worker = index + 1, error = %e, "Worker task did not complete");
                    TaskResult::failure(format!("worker {} task failed: {e}", index + 1))
                })
            })
            .collect();
        let failures = worker_results.iter().filter(|r| !r.success).count();
        info!(workers = worker_results.len(), failures, "Worker results gathered");

        stages.advance(PipelineStage::Synthesizing);
        let mut result = match synthesis_input(task, &strategy, &worker_results) {
            Ok(input) => run_strategist(&self.strategist, input).await,
            Err(e) => TaskResult::failure(format!("failed to build synthesis input: {e}")),
        };
        result.insert_metadata("workers", worker_results.len());
        result.insert_metadata("worker_failures", failures);

        if result.success {
            self.persist(&mut result).await;
        }

        stages.advance(PipelineStage::Done);
        PipelineRun {
            result,
            stages: stages.0,
            strategy,
            worker_results,
        }
    }

    async fn persist(&self, result: &mut TaskResult) {
        let Some(ref engine) = self.knowledge else {
            return;
        };
        let request = StoreRequest::new(result.data.clone())
            .category("task_result")
            .importance(self.result_importance);
        match engine.store_knowledge(request).await {
            Ok(id) => result.insert_metadata("knowledge_id", id),
            Err(e) => {
                warn!(error = %e, "Failed to store pipeline result");
                result.insert_metadata("knowledge_error", e.to_string());
            }
        }
    }
}

async fn run_strategist(strategist: &Arc<dyn Agent>, input: TaskInput) -> TaskResult {
    let strategist = Arc::clone(strategist);
    tokio::spawn(async move { strategist.process(&input).await })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Strategist task did not complete");
            TaskResult::failure(format!("strategist task failed: {e}"))
        })
}

fn synthesis_input(
    task: &TaskInput,
    strategy: &TaskResult,
    worker_results: &[TaskResult],
) -> serde_json::Result<TaskInput> {
    let mut payload = serde_json::Map::new();
    payload.insert("original_task".into(), serde_json::to_value(task)?);
    payload.insert("strategy".into(), serde_json::Value::String(strategy.data.clone()));
    payload.insert("worker_results".into(), serde_json::to_value(worker_results)?);
    Ok(TaskInput::Structured(serde_json::Value::Object(payload)))
}
