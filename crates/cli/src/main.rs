//! Mastermind CLI: the main entry point.
//!
//! Commands:
//! - `init`    — Create the config directory, workspace and default config
//! - `serve`   — Start the HTTP gateway
//! - `task`    — Run one task through the strategist/worker pipeline
//! - `memory`  — Inspect and manage the knowledge store
//! - `tools`   — List or invoke tools
//! - `config`  — Show, locate or validate configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mastermind",
    about = "Mastermind: strategist/worker orchestration over tiered knowledge memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a task through the pipeline
    Task {
        /// The task text
        task: String,

        /// Override the number of workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print the strategy and every worker result
        #[arg(long)]
        trace: bool,
    },

    /// Manage the knowledge store
    Memory {
        #[command(subcommand)]
        command: commands::memory::MemoryCommand,
    },

    /// List or invoke tools
    Tools {
        #[command(subcommand)]
        command: commands::tools::ToolsCommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config_cmd::ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Task {
            task,
            workers,
            trace,
        } => commands::task::run(task, workers, trace).await?,
        Commands::Memory { command } => commands::memory::run(command).await?,
        Commands::Tools { command } => commands::tools::run(command).await?,
        Commands::Config { command } => commands::config_cmd::run(command).await?,
    }

    Ok(())
}
