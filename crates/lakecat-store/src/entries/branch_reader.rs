use super::query::{EntryQuery, SelectQuery};
use super::{EntryReader, RowSource};
use crate::errors::Result;
use lakecat_core::{select_significant, CatalogError, CommitId, ExError, Snapshot, VersionRow};
use tracing::debug;

/// Buffered, resumable scan of one branch at a snapshot
///
/// Rows are fetched `buffer_size` at a time in `(path, min_commit DESC)`
/// order and collapsed to one significant row per path. A path group is
/// only emitted once a later path has been fetched or the group has been
/// completed by an extension, so a group is never split across two
/// emissions regardless of buffer size.
pub struct BranchReader<'a, S: RowSource + ?Sized> {
    source: &'a S,
    branch_id: i64,
    snapshot: Snapshot,
    buffer_size: usize,
    after: Option<String>,
    buf: Vec<VersionRow>,
    /// Offset of the first unconsumed row in `buf`
    head: usize,
    /// Path and `min_commit` of the last row ever fetched
    last_fetched: Option<(String, CommitId)>,
    started: bool,
    eof: bool,
    failed: Option<ExError>,
}

impl<'a, S: RowSource + ?Sized> BranchReader<'a, S> {
    /// Create a reader over `branch_id` that starts strictly after `after`
    ///
    /// Nothing is fetched until the first call to `next_entry`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `buffer_size` is zero.
    pub fn new(
        source: &'a S,
        branch_id: i64,
        snapshot: Snapshot,
        buffer_size: usize,
        after: Option<&str>,
    ) -> Result<Self> {
        if buffer_size == 0 {
            return Err(CatalogError::InvalidBufferSize { buffer_size }.into());
        }
        Ok(Self {
            source,
            branch_id,
            snapshot,
            buffer_size,
            after: after.map(str::to_string),
            buf: Vec::with_capacity(buffer_size),
            head: 0,
            last_fetched: None,
            started: false,
            eof: false,
            failed: None,
        })
    }

    pub fn branch_id(&self) -> i64 {
        self.branch_id
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    fn advance(&mut self) -> Result<Option<VersionRow>> {
        if !self.started {
            self.fill()?;
            self.started = true;
        }
        self.ensure_leading_group()?;

        let pending = &self.buf[self.head..];
        let Some(first) = pending.first() else {
            self.eof = true;
            return Ok(None);
        };
        let group_len = pending
            .iter()
            .position(|row| row.path != first.path)
            .unwrap_or(pending.len());
        let chosen = select_significant(&pending[..group_len], self.snapshot);

        self.head += group_len;
        if self.head == self.buf.len() {
            self.buf.clear();
            self.head = 0;
        }
        Ok(chosen)
    }

    /// Make sure every version of the leading path is in the buffer
    fn ensure_leading_group(&mut self) -> Result<()> {
        loop {
            let Some((last_path, _)) = &self.last_fetched else {
                return Ok(());
            };
            let pending = &self.buf[self.head..];
            if let Some(first) = pending.first() {
                if &first.path != last_path {
                    return Ok(());
                }
            }

            let was_empty = pending.is_empty();
            let fetched = self.extend()?;
            if !was_empty || fetched == 0 {
                return Ok(());
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let query = EntryQuery::select(
            SelectQuery::visible(self.branch_id, self.snapshot)
                .after(self.after.as_deref())
                .limit(self.buffer_size),
        );
        let rows = self.fetch(&query)?;
        debug!(
            branch_id = self.branch_id,
            snapshot = %self.snapshot,
            buffer_size = self.buffer_size,
            rows = rows.len(),
            "filled branch buffer"
        );
        self.append(rows);
        Ok(())
    }

    /// Fetch the older versions of the last fetched path plus the next
    /// `buffer_size` rows after it; returns the number of rows fetched
    fn extend(&mut self) -> Result<usize> {
        let Some((path, below)) = self.last_fetched.clone() else {
            return Ok(0);
        };
        let completion =
            SelectQuery::visible(self.branch_id, self.snapshot).older_versions_of(&path, below);
        let continuation = SelectQuery::visible(self.branch_id, self.snapshot)
            .after(Some(&path))
            .limit(self.buffer_size);
        let rows = self.fetch(&EntryQuery::union_all(completion, continuation))?;
        debug!(
            branch_id = self.branch_id,
            snapshot = %self.snapshot,
            path = %path,
            rows = rows.len(),
            "extended branch buffer"
        );

        self.buf.drain(..self.head);
        self.head = 0;
        let fetched = rows.len();
        self.append(rows);
        Ok(fetched)
    }

    fn fetch(&self, query: &EntryQuery) -> Result<Vec<VersionRow>> {
        self.source.fetch_rows(query).map_err(|e| {
            if e.branch_id().is_some() {
                e
            } else {
                e.with_branch_id(self.branch_id)
            }
        })
    }

    fn append(&mut self, rows: Vec<VersionRow>) {
        if let Some(last) = rows.last() {
            self.last_fetched = Some((last.path.clone(), last.min_commit));
        }
        self.buf.extend(rows);
    }
}

impl<S: RowSource + ?Sized> EntryReader for BranchReader<'_, S> {
    fn next_entry(&mut self) -> Result<Option<VersionRow>> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.eof {
            return Ok(None);
        }
        match self.advance() {
            Ok(row) => Ok(row),
            Err(err) => {
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::test_support::{catalog, paths, FlakySource};
    use crate::entries::drain;
    use lakecat_core::ExErrorKind;

    const MAX: i64 = i64::MAX;

    fn read_all(
        conn: &rusqlite::Connection,
        branch: i64,
        snapshot: Snapshot,
        buffer_size: usize,
        after: Option<&str>,
    ) -> Vec<VersionRow> {
        let mut reader = BranchReader::new(conn, branch, snapshot, buffer_size, after).unwrap();
        drain(&mut reader).unwrap()
    }

    #[test]
    fn test_empty_branch_is_immediately_exhausted() {
        let conn = catalog(&[(2, "x", 1, MAX)]);
        let mut reader = BranchReader::new(&conn, 1, Snapshot::Committed, 10, None).unwrap();
        assert_eq!(reader.next_entry().unwrap(), None);
        assert_eq!(reader.next_entry().unwrap(), None);
    }

    #[test]
    fn test_one_row_per_path_in_ascending_order() {
        let conn = catalog(&[
            (1, "c", 1, MAX),
            (1, "a", 1, 2),
            (1, "a", 2, MAX),
            (1, "b", 1, MAX),
        ]);
        let rows = read_all(&conn, 1, Snapshot::Committed, 10, None);
        assert_eq!(paths(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[0].min_commit, CommitId(2));
    }

    #[test]
    fn test_group_larger_than_buffer_is_emitted_once() {
        let conn = catalog(&[
            (1, "a", 1, 2),
            (1, "a", 2, 3),
            (1, "a", 3, 4),
            (1, "a", 4, MAX),
            (1, "b", 1, MAX),
        ]);
        for buffer_size in 1..=6 {
            let rows = read_all(&conn, 1, Snapshot::Committed, buffer_size, None);
            assert_eq!(paths(&rows), vec!["a", "b"], "buffer_size={}", buffer_size);
            assert_eq!(rows[0].min_commit, CommitId(4));
        }
    }

    #[test]
    fn test_buffer_of_one_walks_every_path() {
        let conn = catalog(&[
            (1, "a", 1, MAX),
            (1, "b", 1, 3),
            (1, "b", 3, MAX),
            (1, "c", 2, MAX),
            (1, "d", 1, MAX),
        ]);
        let rows = read_all(&conn, 1, Snapshot::Committed, 1, None);
        assert_eq!(paths(&rows), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_resume_after_path_skips_earlier_paths() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 1, MAX), (1, "c", 1, MAX)]);
        let rows = read_all(&conn, 1, Snapshot::Committed, 2, Some("a"));
        assert_eq!(paths(&rows), vec!["b", "c"]);

        let rows = read_all(&conn, 1, Snapshot::Committed, 2, Some("c"));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_committed_read_hides_staged_rows() {
        let conn = catalog(&[(1, "a", 0, MAX), (1, "b", 1, MAX)]);
        let committed = read_all(&conn, 1, Snapshot::Committed, 10, None);
        assert_eq!(paths(&committed), vec!["b"]);

        let uncommitted = read_all(&conn, 1, Snapshot::Uncommitted, 10, None);
        assert_eq!(paths(&uncommitted), vec!["a", "b"]);
        assert!(uncommitted[0].is_staged());
    }

    #[test]
    fn test_concrete_snapshot_sees_history() {
        let conn = catalog(&[
            (1, "a", 1, 3),
            (1, "a", 3, MAX),
            (1, "b", 2, 4),
            (1, "c", 5, MAX),
        ]);
        let rows = read_all(&conn, 1, Snapshot::At(CommitId(3)), 10, None);

        assert_eq!(paths(&rows), vec!["a", "b"]);
        assert_eq!(rows[0].min_commit, CommitId(3));
        // b was deleted at 4, after the pinned commit
        assert!(rows[1].is_alive());
    }

    #[test]
    fn test_deleted_row_is_still_emitted() {
        let conn = catalog(&[(1, "a", 1, 2)]);
        let rows = read_all(&conn, 1, Snapshot::Committed, 10, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].max_commit, CommitId(2));
    }

    #[test]
    fn test_extension_uses_union_of_completion_and_continuation() {
        let conn = catalog(&[(1, "a", 1, 2), (1, "a", 2, MAX), (1, "b", 1, MAX)]);
        let source = FlakySource::new(&conn, None);
        let mut reader = BranchReader::new(&source, 1, Snapshot::Committed, 1, None).unwrap();

        assert_eq!(reader.next_entry().unwrap().unwrap().path, "a");
        let queries = source.queries.borrow();
        assert!(matches!(queries[0], EntryQuery::Select(_)));
        assert!(matches!(queries[1], EntryQuery::UnionAll(_, _)));
    }

    #[test]
    fn test_failure_is_sticky() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 1, MAX), (1, "c", 1, MAX)]);
        let source = FlakySource::new(&conn, Some(2));
        let mut reader = BranchReader::new(&source, 1, Snapshot::Committed, 1, None).unwrap();

        let err = loop {
            match reader.next_entry() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("stream ended without surfacing the failure"),
                Err(err) => break err,
            }
        };
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(err.branch_id(), Some(1));

        let calls = source.calls.get();
        let again = reader.next_entry().unwrap_err();
        assert_eq!(again.kind(), ExErrorKind::Persistence);
        assert_eq!(source.calls.get(), calls);
    }

    #[test]
    fn test_zero_buffer_size_is_rejected() {
        let conn = catalog(&[]);
        let err = BranchReader::new(&conn, 1, Snapshot::Committed, 0, None)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
