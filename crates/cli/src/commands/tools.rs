//! `mastermind tools` — List or invoke tools.

use clap::Subcommand;
use mastermind_core::tool::ToolName;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// List available tools
    List,

    /// Invoke a tool with JSON parameters
    Run {
        name: ToolName,
        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
}

pub async fn run(command: ToolsCommand) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let engine = super::open_engine(&config).await?;
    let workspace = Arc::new(mastermind_tools::Workspace::open(config.workspace_dir())?);
    let registry = mastermind_tools::default_registry(workspace.clone(), engine);

    match command {
        ToolsCommand::List => {
            println!("🔧 Tools (workspace: {})", workspace.root().display());
            for name in registry.names() {
                if let Some(tool) = registry.get(name) {
                    println!("  {:<18} {}", name, tool.description());
                }
            }
        }
        ToolsCommand::Run { name, params } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).map_err(|e| format!("Invalid --params JSON: {e}"))?;
            let output = registry.invoke(name, params).await?;
            if output.success {
                println!("{}", output.output);
            } else {
                return Err(output.output.into());
            }
        }
    }

    Ok(())
}
