//! lakecat store - SQLite persistence and lineage-aware entry reads
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - The entry query builder and the `RowSource` storage seam
//! - `BranchReader`: buffered, resumable scan of one branch
//! - `LineageReader`: k-way merge of a branch and its pinned ancestors
//! - Lineage resolution from the `branch_lineage` table
//! - Branch/commit/entry repository and YAML seed import

pub mod db;
pub mod entries;
pub mod errors;
pub mod lineage;
pub mod migrations;
pub mod repo;
pub mod seed;

// Re-export key types
pub use entries::{
    drain, BranchReader, EntryQuery, EntryReader, LineageReader, ReadOptions, RowSource,
};
pub use errors::Result;
pub use lineage::{LineageResolver, SqliteLineageResolver};
