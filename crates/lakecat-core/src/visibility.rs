//! Significant-entry selection
//!
//! A branch can hold several versions of one path. After the visibility
//! filter has been applied by the query, the rows of a path arrive ordered
//! by `min_commit` descending and exactly one of them represents the path
//! for the read.

use crate::model::{CommitId, Snapshot, VersionRow};

/// Pick the row that represents a path group at `snapshot`.
///
/// The freshest admitted row (the first of the group) wins, including when
/// the group also carries a staged `min_commit == 0` row at its tail. The
/// chosen row then gets [`correct_future_tombstone`].
///
/// Returns `None` only for an empty group.
pub fn select_significant(group: &[VersionRow], snapshot: Snapshot) -> Option<VersionRow> {
    // TODO: groups read at Snapshot::Uncommitted never surface their staged
    // tail row; revisit once staged writes can supersede committed versions.
    let first = group.first()?;
    Some(correct_future_tombstone(first.clone(), snapshot))
}

/// Report a row as alive when its deletion lies at or after a pinned commit.
///
/// Only concrete snapshots are corrected; `Committed` and `Uncommitted` read
/// the branch head, where the recorded `max_commit` is authoritative.
pub fn correct_future_tombstone(mut row: VersionRow, snapshot: Snapshot) -> VersionRow {
    if let Snapshot::At(pinned) = snapshot {
        if !row.max_commit.is_max() && row.max_commit >= pinned {
            row.max_commit = CommitId::MAX;
        }
    }
    row
}
