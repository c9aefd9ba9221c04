//! `mastermind memory` — Knowledge store commands.

use clap::Subcommand;
use mastermind_core::knowledge::Tier;
use mastermind_memory::{KnowledgeEngine, RetrieveRequest, StoreRequest};

use super::preview;

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// Store a piece of knowledge
    Store {
        content: String,
        #[arg(short, long, default_value = "general")]
        category: String,
        #[arg(short, long, default_value_t = 0.5)]
        importance: f32,
        /// Store in context memory regardless of importance
        #[arg(long)]
        context: bool,
    },

    /// Search all tiers for a query
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        min_importance: Option<f32>,
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Set the importance of an item
    Update {
        id: String,
        importance: f32,
        #[arg(short, long, default_value = "long_term")]
        tier: String,
    },

    /// Move an item to another tier
    Retier {
        id: String,
        #[arg(long)]
        from: Tier,
        #[arg(long)]
        to: Tier,
    },

    /// Delete an item
    Delete {
        id: String,
        #[arg(short, long)]
        tier: Tier,
    },

    /// Evict low-importance items now
    Cleanup,

    /// Show per-tier counts
    Stats,
}

pub async fn run(command: MemoryCommand) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let engine = super::open_engine(&config).await?;

    match command {
        MemoryCommand::Store {
            content,
            category,
            importance,
            context,
        } => {
            let request = StoreRequest::new(content)
                .category(category)
                .importance(importance)
                .context_specific(context);
            let tier = engine.policy().route(request.importance, request.is_context_specific);
            let id = engine.store_knowledge(request).await?;
            println!("💾 Stored {id} in {tier}");
        }
        MemoryCommand::Search {
            query,
            limit,
            min_importance,
            category,
        } => {
            let mut request = RetrieveRequest::new(query.as_str())
                .max_results(limit.unwrap_or(config.memory.default_max_results))
                .min_importance(min_importance.unwrap_or(config.memory.default_min_importance));
            if let Some(category) = category {
                request = request.category(category);
            }
            search(&engine, request).await?;
        }
        MemoryCommand::Update {
            id,
            importance,
            tier,
        } => {
            if engine.update_importance(&id, importance, &tier).await? {
                println!("✅ Updated {id} to importance {importance:.2}");
            } else {
                return Err(format!("No item {id} in {tier}").into());
            }
        }
        MemoryCommand::Retier { id, from, to } => {
            if engine.retier(&id, from, to).await? {
                println!("✅ Moved {id} from {from} to {to}");
            } else {
                return Err(format!("No item {id} in {from}").into());
            }
        }
        MemoryCommand::Delete { id, tier } => {
            if engine.delete_knowledge(&id, tier).await? {
                println!("🗑️  Deleted {id} from {tier}");
            } else {
                return Err(format!("No item {id} in {tier}").into());
            }
        }
        MemoryCommand::Cleanup => {
            let report = engine.cleanup_memories().await?;
            println!("🧹 Evicted {} items", report.total());
            println!("   short_term: {}", report.short_term.len());
            println!("   long_term:  {}", report.long_term.len());
        }
        MemoryCommand::Stats => {
            let counts = engine.tier_counts().await?;
            println!("🧠 Memory Statistics");
            println!("====================");
            println!("  Backend:    {}", config.memory.backend);
            if config.memory.backend == "sqlite" {
                println!("  Database:   {}", config.memory.database_path().display());
            }
            println!("  Embeddings: {} ({} dims)", config.embedding.provider, config.embedding.dimensions);
            println!("  short_term: {}", counts.short_term);
            println!("  long_term:  {}", counts.long_term);
            println!("  context:    {}", counts.context);
            println!("  total:      {}", counts.total());
        }
    }

    Ok(())
}

async fn search(
    engine: &KnowledgeEngine,
    request: RetrieveRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Searching knowledge for: \"{}\"", request.query);
    println!();

    let results = engine.retrieve_knowledge(request).await?;
    if results.is_empty() {
        println!("   No knowledge found.");
    }
    for (i, item) in results.iter().enumerate() {
        println!(
            "  {:>2}. [{} | importance {:.2} | relevance {:.2}] {}",
            i + 1,
            item.tier,
            item.importance,
            item.relevance,
            preview(&item.content, 80)
        );
        println!("      id: {}  category: {}", item.id, item.category);
    }
    Ok(())
}
