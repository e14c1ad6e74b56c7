//! Questlog
//!
//! Command-line frontend for the game catalog: add, edit, remove and browse
//! finished games, and back the collection up to JSON.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use questlog_catalog::CatalogContext;
use questlog_config::QuestlogConfig;
use std::path::PathBuf;

/// Questlog game catalog
#[derive(Parser, Debug)]
#[command(name = "questlog")]
#[command(version, about = "Catalog of games you have finished")]
struct Args {
    /// Configuration file (defaults to the user, then system, config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    setup_logging(&config.logging.level);

    let context = CatalogContext::new(config);
    if let Err(e) = commands::run(&context, args.command).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Resolve configuration from flags and default locations
fn load_config(args: &Args) -> Result<QuestlogConfig> {
    let mut config = match &args.config {
        Some(path) => QuestlogConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => QuestlogConfig::load_default().context("loading configuration")?,
    };

    if let Some(db) = &args.db {
        config.storage.path = db.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Setup logging to stderr; `RUST_LOG` overrides the configured level
fn setup_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
