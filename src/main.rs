//! para-memory — fact lifecycle and decay engine.
//!
//! Short-lived CLI invocations over the entity corpus: `checkpoint`
//! merges a batch of extracted candidate facts, `decay` recomputes tiers
//! and regenerates summaries, `touch` reheats a fact, `view` prints the
//! tiered active-only view of an entity.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use para_memory::models::{CheckpointBatch, EntityKey};
use para_memory::services::Runner;
use para_memory::{config, Error};

#[derive(Parser)]
#[command(
    name = "para-memory",
    version,
    about = "Fact lifecycle and decay engine for PARA-style agent memory"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a batch of extracted candidate facts into the corpus
    Checkpoint {
        /// JSON batch file produced by the extraction step
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
    /// Recompute tiers and regenerate entity summaries
    Decay {
        /// Regenerate summaries only; skip backfill and housekeeping
        #[arg(long)]
        quick: bool,
    },
    /// Reheat a fact (bump its access metadata)
    Touch {
        /// Entity key, e.g. people/tara or projects/bards-and-cards
        entity: String,
        /// Fact id within the entity, e.g. tar-003
        fact_id: String,
    },
    /// Print an entity's tiered, active-only fact view
    View {
        /// Entity key, e.g. people/tara
        entity: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_key(raw: &str) -> Result<EntityKey, Error> {
    EntityKey::parse(raw)
        .ok_or_else(|| Error::InvalidInput(format!("invalid entity key: {:?}", raw)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "para_memory=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::init();
    let runner = Runner::from_config(config);
    let now = Utc::now();

    match Cli::parse().command {
        Commands::Checkpoint { input } => {
            let raw = tokio::fs::read_to_string(&input).await?;
            let batch: CheckpointBatch = serde_json::from_str(&raw)?;
            let report = runner.checkpoint(&batch, now).await?;
            println!("checkpoint: {}", report);
            for (entity, error) in &report.failures {
                println!("  failed {}: {}", entity, error);
            }
        }
        Commands::Decay { quick } => {
            let report = runner.run_decay(now, quick).await?;
            println!("decay: {}", report);
            for entity in &report.quarantined {
                println!("  quarantined {}", entity);
            }
            for entity in &report.busy {
                println!("  busy {}", entity);
            }
        }
        Commands::Touch { entity, fact_id } => {
            let key = parse_key(&entity)?;
            let fact = runner.touch(&key, &fact_id, now).await?;
            println!(
                "touched {}#{}: accessed {}x, last {}",
                key,
                fact.id,
                fact.access_count,
                fact.last_accessed
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "never".to_string()),
            );
        }
        Commands::View { entity, json } => {
            let key = parse_key(&entity)?;
            let view = runner.view(&key, now).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{} ({} active facts)", view.entity, view.facts.len());
                for fv in &view.facts {
                    println!(
                        "  [{}] {} **{}**: {}",
                        fv.tier, fv.fact.id, fv.fact.category, fv.fact.fact
                    );
                }
                if !view.related_entities.is_empty() {
                    println!("  connected to: {}", view.related_entities.join(", "));
                }
            }
        }
    }

    Ok(())
}
