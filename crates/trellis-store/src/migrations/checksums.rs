//! Checksums of embedded migration SQL

use sha2::{Digest, Sha256};

/// SHA-256 of the migration text, hex encoded
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
