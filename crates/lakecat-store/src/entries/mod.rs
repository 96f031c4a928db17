//! Lineage-aware entry reads
//!
//! A read walks version rows of one branch (and, through
//! [`LineageReader`], its ancestors) in ascending path order, emitting one
//! significant row per path. Rows come from a [`RowSource`], which the
//! readers only ever hand an [`EntryQuery`].

mod branch_reader;
mod lineage_reader;
pub mod query;

pub use branch_reader::BranchReader;
pub use lineage_reader::LineageReader;
pub use query::{EntryQuery, PathBound, SelectQuery};

use crate::errors::{query_failed, Result};
use lakecat_core::{CatalogError, CommitId, RowLocator, VersionRow};
use rusqlite::{params_from_iter, Connection, Row, Transaction};

/// Default number of rows fetched per round-trip
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Pull-based stream of significant version rows in ascending path order
pub trait EntryReader {
    /// Next row, or `Ok(None)` once the stream is exhausted
    ///
    /// # Errors
    ///
    /// Any storage failure. Once an error has been returned the reader keeps
    /// returning it.
    fn next_entry(&mut self) -> Result<Option<VersionRow>>;
}

/// Storage collaborator that executes entry queries
///
/// Implementations must return rows in the order the query asks for:
/// ascending `path`, then descending `min_commit`.
pub trait RowSource {
    /// # Errors
    ///
    /// Storage failures, reported as `Persistence` errors.
    fn fetch_rows(&self, query: &EntryQuery) -> Result<Vec<VersionRow>>;
}

impl RowSource for Connection {
    fn fetch_rows(&self, query: &EntryQuery) -> Result<Vec<VersionRow>> {
        let (sql, params) = query.to_sql();
        let mut stmt = self
            .prepare_cached(&sql)
            .map_err(|e| query_failed("fetch_rows", e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), row_to_version_row)
            .map_err(|e| query_failed("fetch_rows", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| query_failed("fetch_rows", e))
    }
}

impl RowSource for Transaction<'_> {
    fn fetch_rows(&self, query: &EntryQuery) -> Result<Vec<VersionRow>> {
        let conn: &Connection = self;
        conn.fetch_rows(query)
    }
}

impl<T: RowSource + ?Sized> RowSource for &T {
    fn fetch_rows(&self, query: &EntryQuery) -> Result<Vec<VersionRow>> {
        (**self).fetch_rows(query)
    }
}

/// Map a row selected with the entry query columns
pub(crate) fn row_to_version_row(row: &Row) -> rusqlite::Result<VersionRow> {
    Ok(VersionRow {
        branch_id: row.get("branch_id")?,
        path: row.get("path")?,
        min_commit: CommitId(row.get("min_commit")?),
        max_commit: CommitId(row.get("max_commit")?),
        row_locator: RowLocator(row.get("row_locator")?),
    })
}

/// Tuning for a lineage read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Rows fetched per round-trip for each branch in the lineage
    pub buffer_size: usize,
    /// Maximum rows to return; `0` means unlimited
    pub limit: usize,
    /// Resume strictly after this path
    pub after: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            limit: 0,
            after: None,
        }
    }
}

impl ReadOptions {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// # Errors
    ///
    /// `InvalidInput` when `buffer_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(CatalogError::InvalidBufferSize {
                buffer_size: self.buffer_size,
            }
            .into());
        }
        Ok(())
    }
}

/// Read every remaining row of `reader`
///
/// # Errors
///
/// The first error the reader returns.
pub fn drain<R: EntryReader + ?Sized>(reader: &mut R) -> Result<Vec<VersionRow>> {
    let mut rows = Vec::new();
    while let Some(row) = reader.next_entry()? {
        rows.push(row);
    }
    Ok(rows)
}
