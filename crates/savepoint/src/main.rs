//! savepoint - snapshot and undo for documents saved as whole files.
//!
//! This is the main entry point for the savepoint CLI.

mod commands;

use clap::{Parser, Subcommand};
use savepoint_snapshot::{SaveCoordinator, SnapshotConfig, SnapshotStore};
use savepoint_util::log::{LogConfig, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "savepoint")]
#[command(author, version, about = "Snapshot and undo for whole-file document saves", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for backup artifacts (overrides config)
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save new content to a document, preserving the current content
    Save {
        /// Document to write
        document: PathBuf,
        /// Read new content from this file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Revert a document to its previous saved state
    Undo {
        /// Document to revert
        document: PathBuf,
        /// Print the previous content to stdout without changing the document
        /// or consuming any snapshot
        #[arg(long)]
        print: bool,
    },
    /// List the snapshots held for a document
    History {
        /// Document to inspect
        document: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    savepoint_util::log::init(LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        },
        ..LogConfig::default()
    });

    let cwd = std::env::current_dir()?;
    let (mut config, sources) = SnapshotConfig::load(Some(cwd.as_path())).await?;
    if let Some(dir) = cli.backup_dir {
        config.backup_dir = Some(dir);
    }

    match cli.command {
        Commands::Save { document, from } => {
            let coordinator = open_coordinator(config).await?;
            commands::save(&coordinator, &document, from.as_deref()).await
        }
        Commands::Undo { document, print } => {
            let coordinator = open_coordinator(config).await?;
            commands::undo(&coordinator, &document, print).await
        }
        Commands::History { document, json } => {
            let coordinator = open_coordinator(config).await?;
            commands::history(&coordinator, &document, json).await
        }
        Commands::Config => commands::config(&config, &sources),
        Commands::Version => {
            println!("savepoint {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn open_coordinator(config: SnapshotConfig) -> anyhow::Result<SaveCoordinator> {
    let store = SnapshotStore::open(config).await?;
    Ok(SaveCoordinator::new(store))
}
