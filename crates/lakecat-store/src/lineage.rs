//! Lineage resolution
//!
//! Turns `(branch, snapshot)` into the ordered list of ancestors a lineage
//! read must merge. Ancestors come from the `branch_lineage` table, nearest
//! first, each pinned to the commit it was forked at.

use crate::errors::{query_failed, Result};
use lakecat_core::{CatalogError, CommitId, ExError, ExErrorKind, LineageCommit, Snapshot};
use rusqlite::{Connection, OptionalExtension};

/// Resolves the ancestors of a branch at a snapshot
pub trait LineageResolver {
    /// Ancestors in priority order; the branch itself is not included
    ///
    /// # Errors
    ///
    /// - `NotFound` when the branch does not exist
    /// - `LineageUnavailable` when the lineage could not be read
    fn resolve(&self, branch_id: i64, snapshot: Snapshot) -> Result<Vec<LineageCommit>>;
}

/// [`LineageResolver`] over the catalog's `branch_lineage` table
pub struct SqliteLineageResolver<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteLineageResolver<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn branch_exists(&self, branch_id: i64) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM branches WHERE id = ?1",
                [branch_id],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| unavailable(branch_id, e))
    }
}

impl LineageResolver for SqliteLineageResolver<'_> {
    fn resolve(&self, branch_id: i64, snapshot: Snapshot) -> Result<Vec<LineageCommit>> {
        if !self.branch_exists(branch_id)? {
            return Err(ExError::from(CatalogError::BranchNotFound {
                branch: branch_id.to_string(),
            })
            .with_op("resolve_lineage")
            .with_branch_id(branch_id));
        }

        // A lineage record applies to reads of the branch at commits in
        // [min_commit, max_commit); head reads use the live record.
        let at = match snapshot {
            Snapshot::At(commit) => commit.value(),
            Snapshot::Committed | Snapshot::Uncommitted => CommitId::MAX.value() - 1,
        };

        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT ancestor_branch_id, effective_commit FROM branch_lineage
                 WHERE branch_id = ?1 AND min_commit <= ?2 AND ?2 < max_commit
                 ORDER BY precedence",
            )
            .map_err(|e| unavailable(branch_id, e))?;
        let rows = stmt
            .query_map(rusqlite::params![branch_id, at], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| unavailable(branch_id, e))?;

        let mut ancestors = Vec::new();
        for row in rows {
            let (ancestor, effective_commit) = row.map_err(|e| unavailable(branch_id, e))?;
            // Forked before the ancestor's first commit: nothing to inherit
            if effective_commit < CommitId::FIRST.value() {
                continue;
            }
            ancestors.push(LineageCommit::new(
                ancestor,
                Snapshot::At(CommitId(effective_commit)),
            ));
        }

        tracing::debug!(
            branch_id,
            snapshot = %snapshot,
            lineage_len = ancestors.len(),
            "resolved lineage"
        );
        Ok(ancestors)
    }
}

fn unavailable(branch_id: i64, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::LineageUnavailable)
        .with_op("resolve_lineage")
        .with_branch_id(branch_id)
        .with_message("failed to read branch lineage")
        .with_source(query_failed("resolve_lineage", err))
}
