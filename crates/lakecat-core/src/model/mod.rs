pub mod branch;
pub mod commit;
pub mod entry;

pub use branch::{Branch, LineageCommit};
pub use commit::{CommitId, CommitRange, Snapshot};
pub use entry::{EntryRecord, RowLocator, VersionRow};
