//! `mastermind task` — Run one task through the pipeline.

use mastermind_agent::PipelineRun;
use mastermind_config::AppConfig;
use mastermind_core::agent::{TaskInput, TaskResult};

pub async fn run(
    task: String,
    workers: Option<usize>,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!("    MASTERMIND_API_KEY=sk-ant-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    if let Some(workers) = workers {
        if workers == 0 {
            return Err("--workers must be at least 1".into());
        }
        config.orchestrator.workers = workers;
    }

    let engine = super::open_engine(&config).await?;
    let provider = mastermind_providers::build_completion_provider(&config);
    let orchestrator = mastermind_agent::build_orchestrator(&config, provider, Some(engine));

    let input = TaskInput::from(task);
    let run = orchestrator.process_task_traced(&input).await;
    if trace {
        print_trace(&run);
    }
    print_result(&run.result);

    if run.result.success {
        Ok(())
    } else {
        Err("task failed".into())
    }
}

fn print_trace(run: &PipelineRun) {
    let stages: Vec<String> = run
        .stages
        .iter()
        .map(|s| format!("{s:?}").to_lowercase())
        .collect();
    println!("🧭 Stages: {}", stages.join(" → "));
    println!();
    println!("📋 Strategy");
    println!("{}", run.strategy.data);
    for (i, result) in run.worker_results.iter().enumerate() {
        println!();
        if result.success {
            println!("🔧 Worker {}", i + 1);
            println!("{}", result.data);
        } else {
            println!(
                "❌ Worker {} failed: {}",
                i + 1,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!();
}

fn print_result(result: &TaskResult) {
    if result.success {
        println!("{}", result.data);
        if let Some(id) = result.metadata_value("knowledge_id").and_then(|v| v.as_str()) {
            println!();
            println!("💾 Stored as {id}");
        }
    } else {
        eprintln!(
            "❌ {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}
