//! Seed digest canonicalization
//!
//! Computes stable SHA256 digests of seeds for idempotent import

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::seed::format_v0::{SeedBranch, SeedV0};
use lakecat_core::errors::{ExError, ExErrorKind};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical representation of a seed for digest calculation
#[derive(Debug, Clone, Serialize)]
struct CanonicalSeed {
    schema_version: u32,
    branches: Vec<CanonicalBranch>,
}

#[derive(Debug, Clone, Serialize)]
struct CanonicalBranch {
    name: String,
    parent: Option<String>,
    fork_commit: Option<i64>,
    commits: Vec<(i64, String)>,
    entries: Vec<CanonicalEntry>,
}

#[derive(Debug, Clone, Serialize)]
struct CanonicalEntry {
    path: String,
    min_commit: i64,
    max_commit: Option<i64>,
    physical_address: String,
    checksum: String,
    size: i64,
    metadata: serde_json::Value,
}

/// Compute a stable digest for a seed
///
/// Returns a SHA256 hex digest of the canonicalized seed: branches sorted by
/// name, commits by id, entries by `(path, min_commit)`.
///
/// # Errors
///
/// `Serialization` if the canonical form cannot be encoded.
pub fn compute_seed_digest(seed: &SeedV0) -> Result<String> {
    let canonical = canonicalize_seed(seed);

    // serde_json::Value maps serialize with sorted keys
    let json = serde_json::to_string(&canonical).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("seed_digest")
            .with_message(e.to_string())
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn canonicalize_seed(seed: &SeedV0) -> CanonicalSeed {
    let mut branches: Vec<CanonicalBranch> =
        seed.branches.iter().map(canonicalize_branch).collect();
    branches.sort_by(|a, b| a.name.cmp(&b.name));

    CanonicalSeed {
        schema_version: seed.schema_version,
        branches,
    }
}

fn canonicalize_branch(branch: &SeedBranch) -> CanonicalBranch {
    let mut commits: Vec<(i64, String)> = branch
        .commits
        .iter()
        .map(|c| (c.id, c.message.clone()))
        .collect();
    commits.sort();

    let mut entries: Vec<CanonicalEntry> = branch
        .entries
        .iter()
        .map(|e| CanonicalEntry {
            path: e.path.clone(),
            min_commit: e.min_commit,
            max_commit: e.max_commit,
            physical_address: e.physical_address.clone(),
            checksum: e.checksum.clone(),
            size: e.size,
            metadata: e
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        })
        .collect();
    entries.sort_by(|a, b| (&a.path, a.min_commit).cmp(&(&b.path, b.min_commit)));

    CanonicalBranch {
        name: branch.name.clone(),
        parent: branch.parent.clone(),
        fork_commit: branch.fork_commit,
        commits,
        entries,
    }
}
