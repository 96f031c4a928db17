//! lakecat engine - read orchestration
//!
//! `apply_engine_query` runs paginated, lineage-aware entry listings and
//! branch lookups against a catalog connection.

pub mod commands;

pub use commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
pub use commands::read_tools::{EntryPage, ListOptions, Page, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
