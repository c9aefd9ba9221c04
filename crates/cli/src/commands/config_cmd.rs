//! `mastermind config` — Configuration management commands.

use clap::Subcommand;
use mastermind_config::AppConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

pub async fn run(command: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", config_path().display());
            Ok(())
        }
        ConfigCommand::Validate => validate(),
    }
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    redact(&mut config);
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn redact(config: &mut AppConfig) {
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    if config.embedding.api_key.is_some() {
        config.embedding.api_key = Some("[REDACTED]".into());
    }
}

fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set ANTHROPIC_API_KEY or MASTERMIND_API_KEY)");
    }
    if config.embedding.provider == "openai" && config.embedding.api_key.is_none() {
        warnings.push("embedding.provider is openai but no embedding API key is set");
    }
    if config.memory.long_term_threshold > config.memory.routing_threshold {
        warnings.push("long_term_threshold is above routing_threshold; new long-term items may be evicted");
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Strategist: {}", config.models.strategist);
    println!("   Workers:    {} × {}", config.orchestrator.workers, config.models.fast);
    println!("   Premium:    {}", config.models.premium);
    println!("   Memory:     {}", config.memory.backend);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);

    Ok(())
}
