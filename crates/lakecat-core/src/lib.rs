//! lakecat core - catalog model for branch-aware, time-travel entry reads
//!
//! This crate holds the pure, I/O free parts of the catalog:
//! - Commit identifiers, read snapshots and their visibility ranges
//! - Version rows and full entry records
//! - Lineage value types (a branch plus its pinned ancestors)
//! - Significant-entry selection with future-tombstone correction
//! - The error and logging facilities shared by every lakecat crate

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod visibility;

// Re-exported so the logging macros can name the schema constants
pub use lakecat_core_types;

pub use errors::{CatalogError, ExError, ExErrorKind, Result};
pub use model::{
    Branch, CommitId, CommitRange, EntryRecord, LineageCommit, RowLocator, Snapshot, VersionRow,
};
pub use visibility::select_significant;
