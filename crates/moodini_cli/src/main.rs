//! Moodini CLI
//!
//! Maintenance tools for a Moodini data directory.
//!
//! # Commands
//!
//! - `inspect` - Recover each store and print its statistics
//! - `verify` - Check journal and snapshot checksums without opening the stores
//! - `dump-journal` - Print journaled commands for debugging
//! - `checkpoint` - Fold the journals into fresh snapshots

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Moodini data directory tools.
#[derive(Parser)]
#[command(name = "moodini")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A store below the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Store {
    /// Questions and their votes
    Questions,
    /// Users
    Users,
}

impl Store {
    /// Every store, in display order.
    pub const ALL: [Store; 2] = [Store::Questions, Store::Users];

    /// Directory name below the data root.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        use moodini_core::Prevalent;
        match self {
            Store::Questions => moodini_core::QuestionRepository::NAME,
            Store::Users => moodini_core::UserRepository::NAME,
        }
    }

    fn selected(store: Option<Store>) -> Vec<Store> {
        store.map_or_else(|| Store::ALL.to_vec(), |s| vec![s])
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Recover each store and print its statistics
    Inspect {
        /// Only this store (default: all)
        #[arg(short, long, value_enum)]
        store: Option<Store>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check journal and snapshot integrity
    Verify {
        /// Only this store (default: all)
        #[arg(short, long, value_enum)]
        store: Option<Store>,
    },

    /// Dump journal records for debugging
    DumpJournal {
        /// Store whose journal to dump
        #[arg(short, long, value_enum)]
        store: Store,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write fresh snapshots and clear the journals
    Checkpoint {
        /// Only this store (default: all)
        #[arg(short, long, value_enum)]
        store: Option<Store>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { store, format } => {
            let path = cli.path.ok_or("Data path required for inspect")?;
            commands::inspect::run(&path, &Store::selected(store), &format)?;
        }
        Commands::Verify { store } => {
            let path = cli.path.ok_or("Data path required for verify")?;
            commands::verify::run(&path, &Store::selected(store))?;
        }
        Commands::DumpJournal {
            store,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Data path required for dump-journal")?;
            commands::dump_journal::run(&path, store, limit, &format)?;
        }
        Commands::Checkpoint { store } => {
            let path = cli.path.ok_or("Data path required for checkpoint")?;
            commands::checkpoint::run(&path, &Store::selected(store))?;
        }
        Commands::Version => {
            println!("Moodini CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Moodini Core v{}", moodini_core::VERSION);
        }
    }

    Ok(())
}
