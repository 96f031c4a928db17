//! Commit identifiers and read snapshots
//!
//! Rows carry two commit bounds: `min_commit`, the commit that introduced the
//! version (`0` while it is still staged), and `max_commit`, the commit that
//! superseded or deleted it (`CommitId::MAX` while it is alive). A read is
//! pinned to a [`Snapshot`], which decides which rows are admitted.

use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ordered commit number on a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub i64);

impl CommitId {
    /// `min_commit` of a staged, not yet committed row
    pub const STAGED: CommitId = CommitId(0);

    /// `max_commit` of a row that is still alive
    pub const MAX: CommitId = CommitId(i64::MAX);

    /// First real commit number
    pub const FIRST: CommitId = CommitId(1);

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_staged(self) -> bool {
        self == Self::STAGED
    }

    pub fn is_max(self) -> bool {
        self == Self::MAX
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            f.write_str("max")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The point in a branch's history a read is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snapshot {
    /// Only finalized rows, as of the branch head
    Committed,
    /// Finalized rows plus staged rows
    Uncommitted,
    /// Finalized rows up to and including this commit
    At(CommitId),
}

impl Snapshot {
    /// Raw encoding of [`Snapshot::Committed`]
    pub const COMMITTED_RAW: i64 = -1;
    /// Raw encoding of [`Snapshot::Uncommitted`]
    pub const UNCOMMITTED_RAW: i64 = 0;

    /// Pin a read to a concrete commit
    ///
    /// # Errors
    ///
    /// `InvalidSnapshot` when `commit` is not positive.
    pub fn at(commit: i64) -> Result<Self, CatalogError> {
        if commit >= CommitId::FIRST.0 && commit != CommitId::MAX.0 {
            Ok(Snapshot::At(CommitId(commit)))
        } else {
            Err(CatalogError::InvalidSnapshot {
                raw: commit.to_string(),
            })
        }
    }

    /// Decode the integer form used on the wire and in lineage tables:
    /// `-1` committed, `0` uncommitted, positive values a concrete commit.
    ///
    /// # Errors
    ///
    /// `InvalidSnapshot` for any other value.
    pub fn from_raw(raw: i64) -> Result<Self, CatalogError> {
        match raw {
            Self::COMMITTED_RAW => Ok(Snapshot::Committed),
            Self::UNCOMMITTED_RAW => Ok(Snapshot::Uncommitted),
            n => Self::at(n),
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            Snapshot::Committed => Self::COMMITTED_RAW,
            Snapshot::Uncommitted => Self::UNCOMMITTED_RAW,
            Snapshot::At(commit) => commit.0,
        }
    }

    /// The concrete commit this snapshot is pinned to, if any
    pub fn commit(&self) -> Option<CommitId> {
        match self {
            Snapshot::At(commit) => Some(*commit),
            Snapshot::Committed | Snapshot::Uncommitted => None,
        }
    }

    /// Range of `min_commit` values admitted by this snapshot
    pub fn visibility(&self) -> CommitRange {
        match self {
            Snapshot::Committed => CommitRange {
                lower: Some(CommitId::FIRST),
                upper: None,
            },
            Snapshot::Uncommitted => CommitRange {
                lower: None,
                upper: None,
            },
            Snapshot::At(commit) => CommitRange {
                lower: Some(CommitId::FIRST),
                upper: Some(*commit),
            },
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Committed => f.write_str("committed"),
            Snapshot::Uncommitted => f.write_str("uncommitted"),
            Snapshot::At(commit) => write!(f, "{}", commit.0),
        }
    }
}

impl FromStr for Snapshot {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "committed" | "head" => Ok(Snapshot::Committed),
            "uncommitted" | "staged" => Ok(Snapshot::Uncommitted),
            other => other
                .parse::<i64>()
                .map_err(|_| CatalogError::InvalidSnapshot {
                    raw: s.to_string(),
                })
                .and_then(Snapshot::at),
        }
    }
}

/// Inclusive bounds on `min_commit`; `None` leaves that side open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRange {
    pub lower: Option<CommitId>,
    pub upper: Option<CommitId>,
}

impl CommitRange {
    pub fn contains(&self, min_commit: CommitId) -> bool {
        self.lower.map_or(true, |lower| min_commit >= lower)
            && self.upper.map_or(true, |upper| min_commit <= upper)
    }
}
