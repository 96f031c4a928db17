//! Query orchestration layer.
//!
//! Coordinates lineage resolution, the merged entry read and locator
//! resolution on top of the persistence layer.

pub mod engine_query;
pub mod read_tools;
