//! `mastermind serve` — Start the HTTP API server.

use tracing::warn;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🧠 Mastermind Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Memory:    {}", config.memory.backend);
    println!("   Workers:   {}", config.orchestrator.workers);
    if !config.has_api_key() {
        warn!("No API key configured; completions will fail");
    }

    mastermind_gateway::start(config).await?;

    Ok(())
}
