//! Schema checksums
//!
//! The `schema_version` ledger stores a SHA-256 of each chapter's schema SQL
//! so an edited schema file is caught instead of silently skipped.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of migration SQL, with CRLF line endings read as LF
pub fn compute_checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    for (i, line) in sql.split('\n').enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(line.strip_suffix('\r').unwrap_or(line).as_bytes());
    }
    hex::encode(hasher.finalize())
}
