//! Seed import command
//!
//! Usage: lakecat seed import <PATH>

use clap::{Args, Subcommand};
use lakecat_store::seed::SeedImport;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeedCommand {
    /// Import a seed file (or a directory of seed files) into the catalog
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to seed YAML file or directory
    pub path: PathBuf,
}

/// Execute seed command
pub fn execute(args: SeedArgs, db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SeedCommand::Import(import_args) => execute_import(import_args, db),
    }
}

fn execute_import(args: ImportArgs, db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = lakecat_store::db::open_catalog(db)?;

    let seed_files = if args.path.is_dir() {
        // Sorted so that parents in earlier files are imported first
        let mut files: Vec<PathBuf> = std::fs::read_dir(&args.path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    } else {
        vec![args.path]
    };

    for seed_file in seed_files {
        let report = lakecat_store::seed::import_seed(&seed_file, &mut conn)?;
        print_report(&seed_file, &report);
    }

    Ok(())
}

fn print_report(path: &Path, report: &SeedImport) {
    if report.already_imported {
        println!(
            "Already imported {} (digest: {})",
            path.display(),
            report.seed_digest
        );
    } else {
        println!(
            "Imported {} (digest: {}, branches: {}, entries: {})",
            path.display(),
            report.seed_digest,
            report.branch_count,
            report.entry_count
        );
    }
}
