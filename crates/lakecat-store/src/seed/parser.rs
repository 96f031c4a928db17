//! Seed parser with validation
//!
//! Parses YAML and validates schema version, branch references, commit
//! numbering and version uniqueness

#![allow(clippy::result_large_err)]

use crate::errors::{seed_validation, Result};
use crate::repo::SqliteRepo;
use crate::seed::format_v0::{SeedBranch, SeedV0};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Parse a seed file from a path
///
/// # Errors
///
/// `InvalidInput` when the file cannot be read, is not valid YAML, or fails validation.
pub fn parse_seed_file(path: &Path) -> Result<SeedV0> {
    parse_seed_file_with_db(path, None)
}

/// Parse a seed file, resolving parents that are not in the seed against the database
///
/// # Errors
///
/// `InvalidInput` when the file cannot be read, is not valid YAML, or fails validation.
pub fn parse_seed_file_with_db(path: &Path, conn: Option<&Connection>) -> Result<SeedV0> {
    let content = fs::read_to_string(path)
        .map_err(|e| seed_validation(&format!("Failed to read seed file: {}", e)))?;

    parse_seed_str_with_db(&content, conn)
}

/// Parse a seed from a string
///
/// # Errors
///
/// `InvalidInput` when the content is not valid YAML or fails validation.
pub fn parse_seed_str(content: &str) -> Result<SeedV0> {
    parse_seed_str_with_db(content, None)
}

/// Parse a seed from a string with optional database context for parent lookups
///
/// # Errors
///
/// `InvalidInput` when the content is not valid YAML or fails validation.
pub fn parse_seed_str_with_db(content: &str, conn: Option<&Connection>) -> Result<SeedV0> {
    let seed: SeedV0 = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(&format!("YAML parse error: {}", e)))?;

    validate_seed(&seed, conn)?;

    Ok(seed)
}

fn validate_seed(seed: &SeedV0, conn: Option<&Connection>) -> Result<()> {
    if seed.schema_version != 0 {
        return Err(seed_validation(&format!(
            "Unsupported schema_version: {}. Expected 0",
            seed.schema_version
        )));
    }

    // name -> commit ids of branches declared so far
    let mut declared: HashMap<&str, HashSet<i64>> = HashMap::new();

    for branch in &seed.branches {
        if branch.name.trim().is_empty() {
            return Err(seed_validation("Branch name must not be empty"));
        }
        if declared.contains_key(branch.name.as_str()) {
            return Err(seed_validation(&format!(
                "Duplicate branch name: {}",
                branch.name
            )));
        }

        let commits = validate_commits(branch)?;
        validate_parent(branch, &declared, conn)?;
        validate_entries(branch)?;

        declared.insert(branch.name.as_str(), commits);
    }

    Ok(())
}

fn validate_commits(branch: &SeedBranch) -> Result<HashSet<i64>> {
    let mut ids = HashSet::new();
    for commit in &branch.commits {
        if commit.id < 1 {
            return Err(seed_validation(&format!(
                "Commit {} in branch {} must be positive",
                commit.id, branch.name
            )));
        }
        if !ids.insert(commit.id) {
            return Err(seed_validation(&format!(
                "Duplicate commit {} in branch {}",
                commit.id, branch.name
            )));
        }
    }
    Ok(ids)
}

fn validate_parent(
    branch: &SeedBranch,
    declared: &HashMap<&str, HashSet<i64>>,
    conn: Option<&Connection>,
) -> Result<()> {
    let (parent, fork_commit) = match (&branch.parent, branch.fork_commit) {
        (None, None) => return Ok(()),
        (Some(parent), Some(fork_commit)) => (parent, fork_commit),
        (Some(_), None) => {
            return Err(seed_validation(&format!(
                "Branch {} has a parent but no fork_commit",
                branch.name
            )))
        }
        (None, Some(_)) => {
            return Err(seed_validation(&format!(
                "Branch {} has a fork_commit but no parent",
                branch.name
            )))
        }
    };

    if parent == &branch.name {
        return Err(seed_validation(&format!(
            "Branch {} cannot be its own parent",
            branch.name
        )));
    }
    if fork_commit < 1 {
        return Err(seed_validation(&format!(
            "fork_commit of branch {} must be positive",
            branch.name
        )));
    }

    if let Some(parent_commits) = declared.get(parent.as_str()) {
        if !parent_commits.contains(&fork_commit) {
            return Err(seed_validation(&format!(
                "Branch {} forks from commit {} which parent {} does not have",
                branch.name, fork_commit, parent
            )));
        }
        return Ok(());
    }

    // Not earlier in this seed: the parent must already be in the catalog
    let exists = match conn {
        Some(conn) => SqliteRepo::get_branch_by_name(conn, parent)?.is_some(),
        None => false,
    };
    if !exists {
        return Err(seed_validation(&format!(
            "Branch {} references non-existent parent: {}",
            branch.name, parent
        )));
    }
    Ok(())
}

fn validate_entries(branch: &SeedBranch) -> Result<()> {
    let mut versions = HashSet::new();
    for entry in &branch.entries {
        if entry.path.is_empty() {
            return Err(seed_validation(&format!(
                "Entry with empty path in branch {}",
                branch.name
            )));
        }
        if entry.min_commit < 0 {
            return Err(seed_validation(&format!(
                "Entry {} in branch {} has negative min_commit",
                entry.path, branch.name
            )));
        }
        if let Some(max_commit) = entry.max_commit {
            if max_commit <= entry.min_commit {
                return Err(seed_validation(&format!(
                    "Entry {} in branch {} has max_commit {} not after min_commit {}",
                    entry.path, branch.name, max_commit, entry.min_commit
                )));
            }
        }
        if !versions.insert((entry.path.as_str(), entry.min_commit)) {
            return Err(seed_validation(&format!(
                "Duplicate version of {} at commit {} in branch {}",
                entry.path, entry.min_commit, branch.name
            )));
        }
    }
    Ok(())
}
