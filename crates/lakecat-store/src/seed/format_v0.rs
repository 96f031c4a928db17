//! Seed Format v0 schema
//!
//! Defines the YAML structure for seed import

use serde::{Deserialize, Serialize};

/// Top-level seed file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    /// Branches to create; a parent must be listed before its children
    pub branches: Vec<SeedBranch>,
}

/// Branch definition in seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBranch {
    /// Branch name (unique)
    pub name: String,

    /// Branch this one was forked from
    #[serde(default)]
    pub parent: Option<String>,

    /// Commit of `parent` the fork was taken at
    #[serde(default)]
    pub fork_commit: Option<i64>,

    #[serde(default)]
    pub commits: Vec<SeedCommit>,

    #[serde(default)]
    pub entries: Vec<SeedEntry>,
}

/// Commit definition in seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCommit {
    /// Commit number, positive and unique within the branch
    pub id: i64,

    #[serde(default)]
    pub message: String,
}

/// One version of a path in seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEntry {
    pub path: String,

    /// Commit that introduced this version; 0 for a staged write
    pub min_commit: i64,

    /// Commit that superseded or deleted it; absent while alive
    #[serde(default)]
    pub max_commit: Option<i64>,

    pub physical_address: String,

    #[serde(default)]
    pub checksum: String,

    #[serde(default)]
    pub size: i64,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
