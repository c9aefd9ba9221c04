//! `mastermind init` — First-time setup.

use mastermind_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🧠 Mastermind — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let workspace_dir = AppConfig::default().workspace_dir();
    if !workspace_dir.exists() {
        std::fs::create_dir_all(&workspace_dir)?;
        println!("✅ Created workspace directory: {}", workspace_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set ANTHROPIC_API_KEY or add api_key to {}", config_path.display());
        println!("   2. Run: mastermind task \"Describe your task\"");
        println!("   3. Or start the API: mastermind serve\n");
    }

    Ok(())
}
