//! Content-hash gate for incremental ingestion
//!
//! File and chunk hashes live in one table; chunk keys are
//! `<path>::<chunk-name>`. A missing or unreadable file never reports as
//! unchanged — any doubt forces re-ingestion.

use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::graph::Db;

pub struct HashGate {
    db: Db,
    project_id: String,
}

impl HashGate {
    pub fn new(db: Db, project_id: &str) -> Self {
        Self {
            db,
            project_id: project_id.to_string(),
        }
    }

    /// True when the stored hash matches a fresh hash of the file on disk.
    pub fn is_unchanged(&self, file_path: &str) -> bool {
        let Some(stored) = self.stored_hash(file_path) else {
            return false;
        };
        match std::fs::read(file_path) {
            Ok(bytes) => stored == sha256_hex(&String::from_utf8_lossy(&bytes)),
            Err(_) => false,
        }
    }

    /// True when the stored chunk hash equals `current_hash`.
    pub fn is_chunk_unchanged(&self, chunk_key: &str, current_hash: &str) -> bool {
        self.stored_hash(chunk_key).as_deref() == Some(current_hash)
    }

    /// Upsert a hash for a file path or chunk key.
    pub fn record(&self, key: &str, hash: &str) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT OR REPLACE INTO file_hashes (file_path, project_id, content_hash, indexed_at)
             VALUES (?1, ?2, ?3, datetime('now'))",
            params![key, self.project_id, hash],
        )?;
        Ok(())
    }

    fn stored_hash(&self, key: &str) -> Option<String> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT content_hash FROM file_hashes WHERE file_path = ?1 AND project_id = ?2",
            params![key, self.project_id],
            |row| row.get(0),
        )
        .ok()
    }
}

/// Hex-encoded SHA-256 of the text.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hermes;

    fn gate(hermes: &Hermes) -> HashGate {
        HashGate::new(hermes.db().clone(), hermes.project_id())
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sha256_hex("hello world"), sha256_hex("hello world"));
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(sha256_hex("hello"), sha256_hex("world"));
    }

    #[test]
    fn test_hash_is_64_hex_chars() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unknown_file_is_not_unchanged() {
        let hermes = Hermes::in_memory("hash-unknown").unwrap();
        assert!(!gate(&hermes).is_unchanged("/no/such/file.rs"));
    }

    #[test]
    fn test_missing_file_with_stored_hash_forces_reingest() {
        let hermes = Hermes::in_memory("hash-missing").unwrap();
        let gate = gate(&hermes);
        gate.record("/vanished/file.rs", &sha256_hex("gone")).unwrap();
        assert!(!gate.is_unchanged("/vanished/file.rs"));
    }

    #[test]
    fn test_unchanged_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        std::fs::write(&file, "fn lib() {}").unwrap();
        let path = file.to_string_lossy().to_string();

        let hermes = Hermes::in_memory("hash-roundtrip").unwrap();
        let gate = gate(&hermes);
        gate.record(&path, &sha256_hex("fn lib() {}")).unwrap();

        assert!(gate.is_unchanged(&path));
        std::fs::write(&file, "fn lib() { changed(); }").unwrap();
        assert!(!gate.is_unchanged(&path));
    }

    #[test]
    fn test_chunk_hash_lifecycle() {
        let hermes = Hermes::in_memory("hash-chunk").unwrap();
        let gate = gate(&hermes);
        let key = "src/lib.rs::run";
        let hash = sha256_hex("fn run() {}");

        assert!(!gate.is_chunk_unchanged(key, &hash));
        gate.record(key, &hash).unwrap();
        assert!(gate.is_chunk_unchanged(key, &hash));
        assert!(!gate.is_chunk_unchanged(key, &sha256_hex("fn run() { other(); }")));
    }
}
