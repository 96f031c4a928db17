//! lakecat CLI
//!
//! Command-line interface for the lakecat catalog

use clap::{Parser, Subcommand};
use lakecat_core::logging_facility::{self, Profile};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "lakecat")]
#[command(about = "lakecat - Branching catalog for data lake objects", long_about = None)]
struct Cli {
    /// Catalog database path (created and migrated on first use)
    #[arg(long, global = true, default_value = ".lakecat/catalog.db")]
    db: PathBuf,

    /// Logging profile: development, production or test
    #[arg(long, global = true, default_value = "production")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed import operations
    Seed(commands::seed::SeedArgs),
    /// Entry listing operations
    Entries(commands::entries::EntriesArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_profile);

    let result = match cli.command {
        Commands::Seed(args) => commands::seed::execute(args, &cli.db),
        Commands::Entries(args) => commands::entries::execute(args, &cli.db),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
