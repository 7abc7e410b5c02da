//! SHA-256 checksum utility for detecting edits to applied units.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable() {
        let sql = "CREATE TABLE schools (id INTEGER PRIMARY KEY, name VARCHAR)";
        assert_eq!(compute_checksum(sql), compute_checksum(sql));
        assert_eq!(compute_checksum(sql).len(), 64);
    }

    #[test]
    fn test_checksum_detects_edit() {
        assert_ne!(
            compute_checksum("ALTER TABLE students ADD COLUMN grade INTEGER"),
            compute_checksum("ALTER TABLE students ADD COLUMN grade SMALLINT")
        );
    }
}
