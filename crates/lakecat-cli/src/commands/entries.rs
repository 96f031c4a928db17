//! Entry listing command
//!
//! Usage: lakecat entries list --branch <NAME> [--commit committed|uncommitted|N]
//!        [--after <PATH> | --cursor <CURSOR>] [--limit N] [--buffer-size N] [--json]

use clap::{Args, Subcommand};
use lakecat_core::{EntryRecord, Snapshot};
use lakecat_core_types::correlation::RequestContext;
use lakecat_engine::commands::read_tools::encode_cursor;
use lakecat_engine::{apply_engine_query, EngineQuery, EngineQueryResult, ListOptions};
use std::path::Path;

#[derive(Debug, Args)]
pub struct EntriesArgs {
    #[command(subcommand)]
    pub command: EntriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntriesCommand {
    /// List the entries visible on a branch, merged over its lineage
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Branch name
    #[arg(long)]
    pub branch: String,

    /// Snapshot to read: committed, uncommitted or a commit number
    #[arg(long, default_value = "committed")]
    pub commit: Snapshot,

    /// Resume after this path (exclusive)
    #[arg(long, conflicts_with = "cursor")]
    pub after: Option<String>,

    /// Cursor returned by a previous page
    #[arg(long)]
    pub cursor: Option<String>,

    /// Maximum entries to return
    #[arg(long)]
    pub limit: Option<usize>,

    /// Rows fetched per round-trip for each branch
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute entries command
pub fn execute(args: EntriesArgs, db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        EntriesCommand::List(list_args) => execute_list(list_args, db),
    }
}

fn execute_list(args: ListArgs, db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let conn = lakecat_store::db::open_catalog(db)?;
    let ctx = RequestContext::new();

    let branch = match apply_engine_query(
        EngineQuery::GetBranch { name: args.branch },
        &conn,
        &ctx,
    )? {
        EngineQueryResult::Branch(branch) => branch,
        other => return Err(format!("unexpected query result: {:?}", other).into()),
    };

    let options = ListOptions {
        limit: args.limit,
        cursor: args
            .cursor
            .or_else(|| args.after.as_deref().map(encode_cursor)),
        buffer_size: args.buffer_size,
    };
    let query = EngineQuery::ListEntries {
        branch_id: branch.id,
        snapshot: args.commit,
        options,
    };
    let page = match apply_engine_query(query, &conn, &ctx)? {
        EngineQueryResult::Entries(page) => page,
        other => return Err(format!("unexpected query result: {:?}", other).into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    for entry in &page.items {
        println!("{}", format_entry(entry));
    }
    if let Some(cursor) = &page.cursor {
        println!("-- more entries: --cursor {}", cursor);
    }
    Ok(())
}

fn format_entry(entry: &EntryRecord) -> String {
    let state = if entry.max_commit.is_max() {
        "alive"
    } else {
        "deleted"
    };
    format!(
        "{}\t[{}, {})\t{}\t{}\t{}",
        entry.path, entry.min_commit, entry.max_commit, state, entry.size, entry.physical_address
    )
}
