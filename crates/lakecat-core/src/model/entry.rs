use super::commit::CommitId;
use serde::{Deserialize, Serialize};

/// Opaque handle to one physical version row
///
/// Used for a later point lookup of the exact row; it does not own or
/// point at object content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowLocator(pub i64);

/// Primary-key view of one version of an object on a branch
///
/// The object at `path` is this version from `min_commit` until
/// `max_commit` (`CommitId::MAX` while alive). Rows are immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRow {
    pub branch_id: i64,
    pub path: String,
    pub min_commit: CommitId,
    pub max_commit: CommitId,
    pub row_locator: RowLocator,
}

impl VersionRow {
    pub fn is_staged(&self) -> bool {
        self.min_commit.is_staged()
    }

    /// True when no successor or deletion has been recorded
    pub fn is_alive(&self) -> bool {
        self.max_commit.is_max()
    }
}

/// Full physical record behind a [`VersionRow`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub branch_id: i64,
    pub path: String,
    pub min_commit: CommitId,
    pub max_commit: CommitId,
    pub physical_address: String,
    pub checksum: String,
    pub size: i64,
    pub metadata: serde_json::Value,
}

impl EntryRecord {
    /// Overlay the commit bounds chosen by a read onto the stored record
    ///
    /// A read may report a row as alive even though the stored row carries a
    /// later deletion; the listing must show what the read saw.
    pub fn with_bounds_of(mut self, row: &VersionRow) -> Self {
        self.min_commit = row.min_commit;
        self.max_commit = row.max_commit;
        self
    }
}
