//! Agents and the orchestration pipeline for Mastermind.
//!
//! A [`StrategistAgent`] plans each task, a pool of [`WorkerAgent`]s executes
//! the plan concurrently, and the strategist synthesizes their output.
//! [`Orchestrator`] drives the pipeline; [`build_orchestrator`] wires it from
//! configuration.

pub mod builder;
pub mod context_providers;
pub mod orchestrator;
pub mod strategist;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use builder::{build_orchestrator, knowledge_policy, open_knowledge_engine};
pub use context_providers::{KnowledgeContextProvider, ResourceContextProvider};
pub use orchestrator::{Orchestrator, PipelineRun, PipelineStage};
pub use strategist::{StrategistAgent, strategy_prompt};
pub use worker::WorkerAgent;
