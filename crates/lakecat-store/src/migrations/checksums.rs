//! Checksum validation for migrations
//!
//! SHA-256 of the migration SQL; a mismatch means an applied migration was edited

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
