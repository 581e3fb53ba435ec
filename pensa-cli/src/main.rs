use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pensa_core::Settings;
use pensa_knowledge::{KnowledgeEngine, KnowledgeItem, LoadReport, ScoredItem, SourceStatus};

#[derive(Parser)]
#[command(name = "pensa")]
#[command(about = "Query the pensa knowledge base from the command line", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Directory containing config.toml")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank knowledge items against a question
    Query {
        text: String,
        #[arg(long, short, help = "Limit results (default: knowledge.default_limit)")]
        limit: Option<usize>,
        #[arg(long, help = "Show the score breakdown per item")]
        explain: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Load every source and print what was loaded or skipped
    Sources {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pensa_core::load_dotenv();
    let cli = Cli::parse();

    let settings = match &cli.config_dir {
        Some(dir) => Settings::load_from_dir(dir)?,
        None => Settings::load()?,
    };

    // RUST_LOG overrides the configured level
    let level = settings.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();

    let engine = KnowledgeEngine::new(settings.knowledge_settings())?;
    info!(base_url = %engine.settings().base_url, "knowledge engine configured");

    match cli.command {
        Commands::Query {
            text,
            limit,
            explain,
            json,
        } => {
            let limit = limit.unwrap_or(engine.settings().default_limit);
            if explain {
                let scored = engine.explain(&text, limit).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&scored)?);
                } else {
                    print_scored(&scored);
                }
            } else {
                let items = engine.query(&text, limit).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                } else {
                    print_items(&items);
                }
            }
        }
        Commands::Sources { json } => {
            engine.initialize().await?;
            let Some(report) = engine.load_report() else {
                warn!("knowledge engine initialized without a load report");
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else {
                print_report(report, engine.len());
            }
        }
    }

    Ok(())
}

fn print_items(items: &[KnowledgeItem]) {
    if items.is_empty() {
        println!("No results.");
        return;
    }
    for (rank, item) in items.iter().enumerate() {
        println!("{}. [{}] {}", rank + 1, item.id, item.title.as_deref().unwrap_or("-"));
        println!("   {}", item.content);
    }
}

fn print_scored(scored: &[ScoredItem]) {
    if scored.is_empty() {
        println!("No results.");
        return;
    }
    for (rank, entry) in scored.iter().enumerate() {
        println!(
            "{}. [{}] score {:.4} (semantic {:.4} + boost {:.2})",
            rank + 1,
            entry.item.id,
            entry.score,
            entry.semantic,
            entry.keyword_boost
        );
        if let Some(title) = &entry.item.title {
            println!("   {}", title);
        }
    }
}

fn print_report(report: &LoadReport, indexed: usize) {
    let outcomes = report.legacy.iter().chain(report.sources.iter());
    for outcome in outcomes {
        match &outcome.status {
            SourceStatus::Loaded { items, skipped } => println!(
                "ok      {:<20} {:>4} items ({} skipped)  {}",
                outcome.name, items, skipped, outcome.location
            ),
            SourceStatus::Failed { reason } => println!(
                "failed  {:<20} {}  {}",
                outcome.name, outcome.location, reason
            ),
        }
    }
    println!("{} items indexed", indexed);
}
