//! SQLite repository implementation
//!
//! Writes and point lookups for branches, commits, lineage records and
//! entry rows. Every function takes a `&Connection`, so callers can pass a
//! `Transaction` through deref to group writes.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, is_unique_violation, Result};
use lakecat_core::errors::{ExError, ExErrorKind};
use lakecat_core::{Branch, CatalogError, CommitId, EntryRecord, RowLocator};
use rusqlite::{Connection, OptionalExtension, Row};

/// A version row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub path: String,
    pub min_commit: CommitId,
    pub max_commit: CommitId,
    pub physical_address: String,
    pub checksum: String,
    pub size: i64,
    pub metadata: serde_json::Value,
}

impl NewEntry {
    /// Alive entry introduced at `min_commit` with empty metadata
    pub fn new(
        path: impl Into<String>,
        min_commit: CommitId,
        physical_address: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            min_commit,
            max_commit: CommitId::MAX,
            physical_address: physical_address.into(),
            checksum: String::new(),
            size: 0,
            metadata: serde_json::json!({}),
        }
    }

    pub fn deleted_at(mut self, max_commit: CommitId) -> Self {
        self.max_commit = max_commit;
        self
    }
}

/// One `branch_lineage` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageRecord {
    pub branch_id: i64,
    /// 0 for the nearest ancestor
    pub precedence: i64,
    pub ancestor_branch_id: i64,
    /// Commit of the ancestor the branch was forked at
    pub effective_commit: i64,
    /// Commits of `branch_id` this record applies to: `[min_commit, max_commit)`
    pub min_commit: CommitId,
    pub max_commit: CommitId,
}

/// SQLite repository for catalog records
pub struct SqliteRepo;

impl SqliteRepo {
    /// Create a branch and return it with its assigned id
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` when a branch with this name exists
    /// - `Persistence` for any other SQLite failure
    pub fn create_branch(conn: &Connection, name: &str, created_at: i64) -> Result<Branch> {
        conn.execute(
            "INSERT INTO branches (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, created_at],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_op("create_branch")
                    .with_entity_id(name)
                    .with_message("branch already exists")
            } else {
                from_rusqlite(e)
            }
        })?;

        Ok(Branch {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    /// Get a branch by name
    ///
    /// # Errors
    ///
    /// `Persistence` when the query fails.
    pub fn get_branch_by_name(conn: &Connection, name: &str) -> Result<Option<Branch>> {
        conn.query_row(
            "SELECT id, name, created_at FROM branches WHERE name = ?1",
            [name],
            row_to_branch,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Get a branch by id
    ///
    /// # Errors
    ///
    /// `Persistence` when the query fails.
    pub fn get_branch(conn: &Connection, branch_id: i64) -> Result<Option<Branch>> {
        conn.query_row(
            "SELECT id, name, created_at FROM branches WHERE id = ?1",
            [branch_id],
            row_to_branch,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Record a commit on a branch
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `commit` is not a positive commit number
    /// - `AlreadyExists` when the branch already has this commit
    /// - `Persistence` for any other SQLite failure
    pub fn insert_commit(
        conn: &Connection,
        branch_id: i64,
        commit: CommitId,
        message: &str,
        committed_at: i64,
    ) -> Result<()> {
        if commit < CommitId::FIRST || commit.is_max() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("insert_commit")
                .with_branch_id(branch_id)
                .with_message(format!("commit must be positive, got {}", commit.value())));
        }

        conn.execute(
            "INSERT INTO commits (branch_id, commit_id, message, committed_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![branch_id, commit.value(), message, committed_at],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_op("insert_commit")
                    .with_branch_id(branch_id)
                    .with_entity_id(commit.to_string())
                    .with_message("commit already exists")
            } else {
                from_rusqlite(e)
            }
        })?;

        Ok(())
    }

    /// Latest commit recorded for a branch
    ///
    /// # Errors
    ///
    /// `Persistence` when the query fails.
    pub fn head_commit(conn: &Connection, branch_id: i64) -> Result<Option<CommitId>> {
        let head: Option<i64> = conn
            .query_row(
                "SELECT MAX(commit_id) FROM commits WHERE branch_id = ?1",
                [branch_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(head.map(CommitId))
    }

    /// Insert one lineage record
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` when the `(branch, precedence, min_commit)` slot is taken
    /// - `Persistence` for any other SQLite failure
    pub fn insert_lineage(conn: &Connection, record: &LineageRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO branch_lineage
                (branch_id, precedence, ancestor_branch_id, effective_commit, min_commit, max_commit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.branch_id,
                record.precedence,
                record.ancestor_branch_id,
                record.effective_commit,
                record.min_commit.value(),
                record.max_commit.value(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_op("insert_lineage")
                    .with_branch_id(record.branch_id)
                    .with_message(format!(
                        "lineage precedence {} already recorded",
                        record.precedence
                    ))
            } else {
                from_rusqlite(e)
            }
        })?;

        Ok(())
    }

    /// Insert a version row and return its locator
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` when the branch already has a version of this path
    ///   at `min_commit`
    /// - `ConstraintViolation` when `max_commit` is not after `min_commit`
    /// - `Persistence` for any other SQLite failure
    pub fn insert_entry(conn: &Connection, branch_id: i64, entry: &NewEntry) -> Result<RowLocator> {
        if entry.max_commit <= entry.min_commit {
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("insert_entry")
                .with_branch_id(branch_id)
                .with_entity_id(entry.path.clone())
                .with_message(format!(
                    "max_commit {} must be after min_commit {}",
                    entry.max_commit, entry.min_commit
                )));
        }

        let metadata = serde_json::to_string(&entry.metadata).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("insert_entry")
                .with_message(e.to_string())
        })?;

        conn.execute(
            "INSERT INTO entries
                (branch_id, path, min_commit, max_commit, physical_address, checksum, size, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                branch_id,
                entry.path,
                entry.min_commit.value(),
                entry.max_commit.value(),
                entry.physical_address,
                entry.checksum,
                entry.size,
                metadata,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExError::from(CatalogError::DuplicateVersion {
                    branch_id,
                    path: entry.path.clone(),
                    min_commit: entry.min_commit.value(),
                })
                .with_op("insert_entry")
            } else {
                from_rusqlite(e)
            }
        })?;

        Ok(RowLocator(conn.last_insert_rowid()))
    }

    /// Fetch the full record behind a row locator
    ///
    /// # Errors
    ///
    /// - `NotFound` when no row has this locator
    /// - `Serialization` when the stored metadata is not valid JSON
    /// - `Persistence` when the query fails
    pub fn get_entry_by_locator(conn: &Connection, locator: RowLocator) -> Result<EntryRecord> {
        let mut stmt = conn
            .prepare_cached(
                "SELECT branch_id, path, min_commit, max_commit, physical_address, checksum, size, metadata
                 FROM entries WHERE rowid = ?1",
            )
            .map_err(from_rusqlite)?;

        let row = stmt
            .query_row([locator.0], |row| {
                Ok((row_to_entry(row)?, row.get::<_, String>("metadata")?))
            })
            .optional()
            .map_err(from_rusqlite)?;

        let Some((mut record, metadata)) = row else {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op("get_entry_by_locator")
                .with_entity_id(locator.0.to_string())
                .with_message("entry row not found"));
        };

        record.metadata = serde_json::from_str(&metadata).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("get_entry_by_locator")
                .with_entity_id(record.path.clone())
                .with_message(e.to_string())
        })?;
        Ok(record)
    }
}

fn row_to_branch(row: &Row) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_entry(row: &Row) -> rusqlite::Result<EntryRecord> {
    Ok(EntryRecord {
        branch_id: row.get("branch_id")?,
        path: row.get("path")?,
        min_commit: CommitId(row.get("min_commit")?),
        max_commit: CommitId(row.get("max_commit")?),
        physical_address: row.get("physical_address")?,
        checksum: row.get("checksum")?,
        size: row.get("size")?,
        metadata: serde_json::Value::Null,
    })
}
