use super::branch_reader::BranchReader;
use super::{EntryReader, ReadOptions, RowSource};
use crate::errors::Result;
use lakecat_core::{ExError, LineageCommit, Snapshot, VersionRow};
use tracing::debug;

#[derive(Debug, Clone)]
enum MergeState {
    NotStarted,
    Streaming,
    LimitReached,
    Exhausted,
    Failed(ExError),
}

/// K-way merge of a branch and its pinned ancestors
///
/// One [`BranchReader`] per lineage member, the branch under read first.
/// Each pull returns the smallest pending path. When several members hold
/// that path, the one with the lowest index wins and every holder is
/// advanced, so a branch's own version masks its ancestors' versions.
pub struct LineageReader<'a, S: RowSource + ?Sized> {
    readers: Vec<BranchReader<'a, S>>,
    pending: Vec<Option<VersionRow>>,
    /// `None` when unlimited
    limit: Option<usize>,
    returned: usize,
    state: MergeState,
}

impl<'a, S: RowSource + ?Sized> LineageReader<'a, S> {
    /// Build a reader over `branch_id` at `snapshot` plus `ancestors`, which
    /// must already be in priority order (nearest first)
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `options.buffer_size` is zero.
    pub fn new(
        source: &'a S,
        branch_id: i64,
        snapshot: Snapshot,
        ancestors: &[LineageCommit],
        options: &ReadOptions,
    ) -> Result<Self> {
        options.validate()?;

        let members = std::iter::once(LineageCommit::new(branch_id, snapshot))
            .chain(ancestors.iter().cloned());
        let readers = members
            .map(|member| {
                BranchReader::new(
                    source,
                    member.branch_id,
                    member.snapshot,
                    options.buffer_size,
                    options.after.as_deref(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            branch_id,
            snapshot = %snapshot,
            lineage_len = readers.len(),
            buffer_size = options.buffer_size,
            "opened lineage reader"
        );

        Ok(Self {
            pending: vec![None; readers.len()],
            readers,
            limit: (options.limit > 0).then_some(options.limit),
            returned: 0,
            state: MergeState::NotStarted,
        })
    }

    /// Number of rows returned so far
    pub fn returned(&self) -> usize {
        self.returned
    }

    fn prime(&mut self) -> Result<()> {
        for (slot, reader) in self.pending.iter_mut().zip(self.readers.iter_mut()) {
            *slot = reader.next_entry()?;
        }
        Ok(())
    }

    fn pull(&mut self) -> Result<Option<VersionRow>> {
        if matches!(self.state, MergeState::NotStarted) {
            self.prime()?;
            self.state = MergeState::Streaming;
        }

        let mut winner: Option<usize> = None;
        for (idx, slot) in self.pending.iter().enumerate() {
            let Some(row) = slot else { continue };
            let smaller = match winner.and_then(|w| self.pending[w].as_ref()) {
                Some(current) => row.path < current.path,
                None => true,
            };
            if smaller {
                winner = Some(idx);
            }
        }

        let Some(winner) = winner else {
            self.state = MergeState::Exhausted;
            return Ok(None);
        };
        let Some(row) = self.pending[winner].take() else {
            self.state = MergeState::Exhausted;
            return Ok(None);
        };

        self.returned += 1;
        if self.limit.is_some_and(|limit| self.returned >= limit) {
            self.state = MergeState::LimitReached;
            return Ok(Some(row));
        }

        for (idx, reader) in self.readers.iter_mut().enumerate() {
            let shadowed = self.pending[idx]
                .as_ref()
                .is_some_and(|pending| pending.path == row.path);
            if idx == winner || shadowed {
                self.pending[idx] = reader.next_entry()?;
            }
        }

        if self.pending.iter().all(Option::is_none) {
            self.state = MergeState::Exhausted;
        }
        Ok(Some(row))
    }
}

impl<S: RowSource + ?Sized> EntryReader for LineageReader<'_, S> {
    fn next_entry(&mut self) -> Result<Option<VersionRow>> {
        match &self.state {
            MergeState::Failed(err) => return Err(err.clone()),
            MergeState::LimitReached | MergeState::Exhausted => return Ok(None),
            MergeState::NotStarted | MergeState::Streaming => {}
        }
        match self.pull() {
            Ok(row) => Ok(row),
            Err(err) => {
                self.state = MergeState::Failed(err.clone());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::drain;
    use crate::entries::test_support::{catalog, paths, FlakySource};
    use lakecat_core::{CommitId, ExErrorKind};

    const MAX: i64 = i64::MAX;

    fn at(n: i64) -> Snapshot {
        Snapshot::At(CommitId(n))
    }

    #[test]
    fn test_child_row_masks_ancestor_row() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 2, 5), (2, "a", 4, MAX)]);
        let ancestors = [LineageCommit::new(1, at(3))];
        let mut reader = LineageReader::new(
            &conn,
            2,
            Snapshot::Committed,
            &ancestors,
            &ReadOptions::default(),
        )
        .unwrap();

        let rows = drain(&mut reader).unwrap();
        assert_eq!(paths(&rows), vec!["a", "b"]);
        assert_eq!((rows[0].branch_id, rows[0].min_commit), (2, CommitId(4)));
        assert_eq!(rows[1].branch_id, 1);
        // b was deleted at 5, after the ancestor pin of 3
        assert!(rows[1].is_alive());
    }

    #[test]
    fn test_nearer_ancestor_wins_tie() {
        let conn = catalog(&[(1, "p", 1, MAX), (2, "p", 1, MAX), (3, "q", 1, MAX)]);
        let ancestors = [
            LineageCommit::new(2, at(1)),
            LineageCommit::new(1, at(1)),
        ];
        let mut reader = LineageReader::new(
            &conn,
            3,
            Snapshot::Committed,
            &ancestors,
            &ReadOptions::default(),
        )
        .unwrap();

        let rows = drain(&mut reader).unwrap();
        assert_eq!(paths(&rows), vec!["p", "q"]);
        assert_eq!(rows[0].branch_id, 2);
    }

    #[test]
    fn test_limit_stops_stream() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 1, MAX), (1, "c", 1, MAX)]);
        let options = ReadOptions::default().with_limit(2);
        let mut reader = LineageReader::new(&conn, 1, Snapshot::Committed, &[], &options).unwrap();

        assert_eq!(paths(&drain(&mut reader).unwrap()), vec!["a", "b"]);
        assert_eq!(reader.returned(), 2);
        assert_eq!(reader.next_entry().unwrap(), None);
    }

    #[test]
    fn test_limit_larger_than_dataset_returns_everything() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 1, MAX)]);
        let options = ReadOptions::default().with_limit(10);
        let mut reader = LineageReader::new(&conn, 1, Snapshot::Committed, &[], &options).unwrap();
        assert_eq!(drain(&mut reader).unwrap().len(), 2);
    }

    #[test]
    fn test_reaching_limit_issues_no_further_queries() {
        let conn = catalog(&[(1, "a", 1, MAX), (1, "b", 1, MAX), (1, "c", 1, MAX)]);
        let source = FlakySource::new(&conn, None);
        let options = ReadOptions::default().with_limit(1).with_buffer_size(1);
        let mut reader =
            LineageReader::new(&source, 1, Snapshot::Committed, &[], &options).unwrap();

        assert!(reader.next_entry().unwrap().is_some());
        let calls = source.calls.get();
        assert_eq!(reader.next_entry().unwrap(), None);
        assert_eq!(source.calls.get(), calls);
    }

    #[test]
    fn test_all_members_empty_is_eof() {
        let conn = catalog(&[]);
        let ancestors = [LineageCommit::new(7, at(2))];
        let mut reader = LineageReader::new(
            &conn,
            1,
            Snapshot::Uncommitted,
            &ancestors,
            &ReadOptions::default(),
        )
        .unwrap();
        assert_eq!(reader.next_entry().unwrap(), None);
        assert_eq!(reader.next_entry().unwrap(), None);
    }

    #[test]
    fn test_storage_failure_aborts_merge() {
        let conn = catalog(&[(1, "a", 1, MAX), (2, "b", 1, MAX)]);
        let source = FlakySource::new(&conn, Some(2));
        let ancestors = [LineageCommit::new(1, at(1))];
        let mut reader = LineageReader::new(
            &source,
            2,
            Snapshot::Committed,
            &ancestors,
            &ReadOptions::default(),
        )
        .unwrap();

        let err = reader.next_entry().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert!(err.branch_id().is_some());
        assert!(reader.next_entry().is_err());
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_zero_buffer_size_is_rejected() {
        let conn = catalog(&[]);
        let options = ReadOptions::default().with_buffer_size(0);
        let err = LineageReader::new(&conn, 1, Snapshot::Committed, &[], &options)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
