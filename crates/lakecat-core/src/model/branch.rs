use super::commit::Snapshot;
use serde::{Deserialize, Serialize};

/// A named line of catalog history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    /// Seconds since the Unix epoch
    pub created_at: i64,
}

/// One ancestor in a branch's lineage, pinned to the snapshot it is read at
///
/// A lineage is a plain ordered slice of these: nearer ancestors first.
/// The branch being read is not part of the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageCommit {
    pub branch_id: i64,
    pub snapshot: Snapshot,
}

impl LineageCommit {
    pub fn new(branch_id: i64, snapshot: Snapshot) -> Self {
        Self {
            branch_id,
            snapshot,
        }
    }
}
