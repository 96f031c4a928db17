//! Seed importer orchestration
//!
//! Imports a seed into the catalog in one transaction and records its digest
//! so that importing the same seed again changes nothing.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::lineage::{LineageResolver, SqliteLineageResolver};
use crate::repo::{LineageRecord, NewEntry, SqliteRepo};
use crate::seed::format_v0::{SeedBranch, SeedV0};
use crate::seed::{compute_seed_digest, parse_seed_file_with_db, parse_seed_str_with_db};
use lakecat_core::errors::{ExError, ExErrorKind};
use lakecat_core::{CommitId, Snapshot};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;

/// Outcome of a seed import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedImport {
    pub seed_digest: String,
    pub branch_count: usize,
    pub entry_count: usize,
    /// True when this digest had already been imported and nothing was written
    pub already_imported: bool,
}

/// Import a seed file into the database
///
/// 1. Parses and validates the seed YAML (parents may already be in the catalog)
/// 2. Computes the seed digest and skips the import if it was recorded before
/// 3. Creates branches, commits, entries and derived lineage in one transaction
/// 4. Records the digest in `seed_imports`
///
/// # Errors
///
/// - `InvalidInput` when the seed fails validation
/// - `AlreadyExists` when a seeded branch or version already exists
/// - `Persistence` when a write fails; nothing is committed in that case
pub fn import_seed(path: &Path, conn: &mut Connection) -> Result<SeedImport> {
    let seed = parse_seed_file_with_db(path, Some(&*conn))?;
    import_parsed(&seed, conn)
}

/// Import a seed held in a string
///
/// # Errors
///
/// Same as [`import_seed`].
pub fn import_seed_str(content: &str, conn: &mut Connection) -> Result<SeedImport> {
    let seed = parse_seed_str_with_db(content, Some(&*conn))?;
    import_parsed(&seed, conn)
}

fn import_parsed(seed: &SeedV0, conn: &mut Connection) -> Result<SeedImport> {
    let seed_digest = compute_seed_digest(seed)?;
    let branch_count = seed.branches.len();
    let entry_count = seed.branches.iter().map(|b| b.entries.len()).sum();

    if is_imported(conn, &seed_digest)? {
        tracing::info!(seed_digest = %seed_digest, "seed already imported");
        return Ok(SeedImport {
            seed_digest,
            branch_count,
            entry_count,
            already_imported: true,
        });
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let now = chrono::Utc::now().timestamp();

    for branch in &seed.branches {
        import_branch(&tx, branch, now)?;
    }

    tx.execute(
        "INSERT INTO seed_imports (seed_digest, branch_count, entry_count, imported_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![seed_digest, branch_count as i64, entry_count as i64, now],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::info!(
        seed_digest = %seed_digest,
        branch_count,
        entry_count,
        "imported seed"
    );

    Ok(SeedImport {
        seed_digest,
        branch_count,
        entry_count,
        already_imported: false,
    })
}

fn is_imported(conn: &Connection, seed_digest: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM seed_imports WHERE seed_digest = ?1",
        [seed_digest],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(from_rusqlite)
}

fn import_branch(tx: &Transaction, branch: &SeedBranch, now: i64) -> Result<()> {
    let created = SqliteRepo::create_branch(tx, &branch.name, now)?;

    for commit in &branch.commits {
        SqliteRepo::insert_commit(tx, created.id, CommitId(commit.id), &commit.message, now)?;
    }

    if let (Some(parent), Some(fork_commit)) = (&branch.parent, branch.fork_commit) {
        derive_lineage(tx, created.id, parent, fork_commit)?;
    }

    for entry in &branch.entries {
        let new_entry = NewEntry {
            path: entry.path.clone(),
            min_commit: CommitId(entry.min_commit),
            max_commit: entry.max_commit.map(CommitId).unwrap_or(CommitId::MAX),
            physical_address: entry.physical_address.clone(),
            checksum: entry.checksum.clone(),
            size: entry.size,
            metadata: entry
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        };
        SqliteRepo::insert_entry(tx, created.id, &new_entry)?;
    }

    tracing::debug!(
        branch = %branch.name,
        branch_id = created.id,
        entries = branch.entries.len(),
        "seeded branch"
    );
    Ok(())
}

/// The parent at the fork commit comes first, then the parent's own ancestors
fn derive_lineage(tx: &Transaction, branch_id: i64, parent: &str, fork_commit: i64) -> Result<()> {
    let parent_branch = SqliteRepo::get_branch_by_name(tx, parent)?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("seed_import")
            .with_entity_id(parent)
            .with_message("parent branch not found")
    })?;

    let inherited =
        SqliteLineageResolver::new(tx).resolve(parent_branch.id, Snapshot::Committed)?;

    let chain = std::iter::once((parent_branch.id, fork_commit)).chain(
        inherited
            .iter()
            .filter_map(|a| a.snapshot.commit().map(|c| (a.branch_id, c.value()))),
    );

    for (precedence, (ancestor_branch_id, effective_commit)) in chain.enumerate() {
        SqliteRepo::insert_lineage(
            tx,
            &LineageRecord {
                branch_id,
                precedence: precedence as i64,
                ancestor_branch_id,
                effective_commit,
                min_commit: CommitId::STAGED,
                max_commit: CommitId::MAX,
            },
        )?;
    }
    Ok(())
}
