//! In-memory signature database keyed by lowercase SHA256.
//!
//! The database is filled once at service start and read by every scan
//! worker afterwards. Reloads take the write half of an `RwLock`, so they
//! are safe even while a scan is running.

use super::signature::{normalize_digest, Signature, SignatureSource};
use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Signature database.
#[derive(Debug, Default)]
pub struct SignatureDatabase {
    signatures: RwLock<HashMap<String, Signature>>,
    loaded: AtomicBool,
}

impl SignatureDatabase {
    /// Create an empty, not yet loaded database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from signatures already in memory.
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        let db = Self::new();
        {
            let mut map = db.write();
            for sig in signatures {
                insert(&mut map, sig);
            }
        }
        db.loaded.store(true, Ordering::SeqCst);
        db
    }

    /// Load signatures from a JSON source, replacing the current contents.
    ///
    /// A missing or unparsable source leaves the database empty. Either way
    /// the database counts as loaded afterwards.
    pub async fn load(&self, path: &Path) -> usize {
        let parsed = match tokio::fs::read_to_string(path).await {
            Ok(contents) => parse_source(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Signature file not found: {:?}", path);
                Ok(Vec::new())
            }
            Err(e) => Err(Error::SignatureLoad(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        };

        let signatures = parsed.unwrap_or_else(|e| {
            log::error!("{}", e);
            Vec::new()
        });

        let count = {
            let mut map = self.write();
            map.clear();
            for sig in signatures {
                insert(&mut map, sig);
            }
            map.len()
        };

        self.loaded.store(true, Ordering::SeqCst);
        log::info!("Loaded {} signature(s) from {:?}", count, path);
        count
    }

    /// Look up a signature by digest (case-insensitive).
    pub fn find_by_digest(&self, digest: &str) -> Option<Signature> {
        if digest.trim().is_empty() {
            return None;
        }
        self.read().get(&normalize_digest(digest)).cloned()
    }

    /// Check if a digest is known.
    pub fn contains(&self, digest: &str) -> bool {
        self.find_by_digest(digest).is_some()
    }

    /// Add a signature or replace the one with the same digest.
    pub fn add_or_update(&self, signature: Signature) {
        insert(&mut self.write(), signature);
    }

    /// Snapshot of every signature.
    pub fn all(&self) -> Vec<Signature> {
        self.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    // A panicking writer cannot leave the map half-updated in a way readers
    // care about, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Signature>> {
        self.signatures
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Signature>> {
        self.signatures
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_source(contents: &str) -> Result<Vec<Signature>> {
    let source: SignatureSource = serde_json::from_str(contents)
        .map_err(|e| Error::SignatureLoad(format!("Invalid signature file: {}", e)))?;
    Ok(source.into_signatures())
}

fn insert(map: &mut HashMap<String, Signature>, mut signature: Signature) {
    let key = normalize_digest(&signature.sha256);
    if key.is_empty() {
        log::debug!("Skipping signature '{}' without digest", signature.name);
        return;
    }
    signature.sha256 = key.clone();
    map.insert(key, signature);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Severity;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_and_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        std::fs::write(
            &path,
            r#"[
                { "name": "Trojan.Test", "sha256": "ABC123", "severity": "malware" },
                { "name": "Blank", "sha256": "   ", "severity": "malware" }
            ]"#,
        )
        .unwrap();

        let db = SignatureDatabase::new();
        assert!(!db.is_loaded());

        let count = db.load(&path).await;
        assert_eq!(count, 1);
        assert!(db.is_loaded());

        let sig = db.find_by_digest("abc123").unwrap();
        assert_eq!(sig.name, "Trojan.Test");
        assert_eq!(sig.severity, Severity::Malware);
        assert!(db.contains("AbC123"));
        assert!(db.find_by_digest("").is_none());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_fatal() {
        let dir = tempdir().unwrap();
        let db = SignatureDatabase::new();

        let count = db.load(&dir.path().join("absent.json")).await;
        assert_eq!(count, 0);
        assert!(db.is_loaded());
    }

    #[tokio::test]
    async fn test_corrupt_source_leaves_empty_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        std::fs::write(&path, "{ not json").unwrap();

        let db = SignatureDatabase::from_signatures(vec![Signature::new(
            "Old",
            "ff",
            Severity::Adware,
        )]);
        let count = db.load(&path).await;

        assert_eq!(count, 0);
        assert_eq!(db.count(), 0);
        assert!(db.is_loaded());
    }

    #[test]
    fn test_add_or_update() {
        let db = SignatureDatabase::new();
        db.add_or_update(Signature::new("First", "aa", Severity::Pup));
        db.add_or_update(Signature::new("Second", "AA", Severity::Malware));

        assert_eq!(db.count(), 1);
        assert_eq!(db.find_by_digest("aa").unwrap().name, "Second");
        assert_eq!(db.all().len(), 1);
    }
}
