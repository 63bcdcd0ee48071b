//! Quarantine vault manager.
//!
//! The vault owns one directory. Quarantine writes the metadata sidecar with
//! create-new semantics first, then renames the file into the store; a failed
//! rename removes the sidecar again, so a crash never leaves a blob without
//! its restore record.

use std::fs;
use std::path::{Path, PathBuf};

use super::{metadata::QuarantineMetadata, QuarantineResult, BLOB_EXTENSION, METADATA_SUFFIX};
use crate::core::error::{Error, Result};
use crate::core::types::{ScanResult, ThreatLevel};
use crate::detection::signature::normalize_digest;

/// Filesystem-backed quarantine store.
#[derive(Debug, Clone)]
pub struct QuarantineVault {
    base_path: PathBuf,
}

impl QuarantineVault {
    /// Create or open a vault at the specified path.
    pub fn open(base_path: &Path) -> Result<Self> {
        fs::create_dir_all(base_path).map_err(|e| Error::DirectoryAccess {
            path: base_path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            base_path: base_path.to_path_buf(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of the quarantined blob for a digest.
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", normalize_digest(digest), BLOB_EXTENSION))
    }

    /// Location of the metadata sidecar for a digest.
    pub fn metadata_path(&self, digest: &str) -> PathBuf {
        self.base_path
            .join(format!("{}{}", normalize_digest(digest), METADATA_SUFFIX))
    }

    /// Move a file into the vault.
    ///
    /// Refuses without side effects when the file is missing or the digest is
    /// already quarantined.
    pub fn quarantine(
        &self,
        path: &Path,
        digest: &str,
        threat_level: ThreatLevel,
        threat_name: &str,
    ) -> QuarantineResult {
        let digest = normalize_digest(digest);
        let original = path.to_path_buf();

        if !is_valid_digest(&digest) {
            return QuarantineResult::failure(original, digest, "Invalid content digest");
        }

        if !path.is_file() {
            return QuarantineResult::failure(original, digest, "File not found");
        }

        let blob_path = self.blob_path(&digest);
        let metadata_path = self.metadata_path(&digest);

        if blob_path.exists() || metadata_path.exists() {
            log::info!("Skipping {:?}: {} already quarantined", path, digest);
            let mut result =
                QuarantineResult::failure(original, digest, "File already quarantined");
            result.quarantine_path = Some(blob_path);
            return result;
        }

        let metadata = QuarantineMetadata::new(path, digest.clone(), threat_level, threat_name);
        if let Err(e) = metadata.save_new(&metadata_path) {
            return match e {
                Error::FileWrite { ref source, .. }
                    if source.kind() == std::io::ErrorKind::AlreadyExists =>
                {
                    QuarantineResult::failure(original, digest, "File already quarantined")
                }
                other => {
                    log::error!(
                        "Failed to write quarantine metadata {:?}: {}",
                        metadata_path,
                        other
                    );
                    QuarantineResult::failure(original, digest, format!("Error: {}", other))
                }
            };
        }

        if let Err(e) = fs::rename(path, &blob_path) {
            if let Err(cleanup_err) = fs::remove_file(&metadata_path) {
                log::warn!(
                    "Failed to clean up metadata {:?} after move error: {}",
                    metadata_path,
                    cleanup_err
                );
            }
            log::error!("Failed to quarantine {:?}: {}", path, e);
            let message = match e.kind() {
                std::io::ErrorKind::PermissionDenied => "Access denied".to_string(),
                std::io::ErrorKind::NotFound => "File not found".to_string(),
                _ => format!("I/O error: {}", e),
            };
            return QuarantineResult::failure(original, digest, message);
        }

        log::info!("Quarantined {:?} -> {:?}", path, blob_path);
        QuarantineResult::success(original, digest, blob_path, metadata_path)
    }

    /// Quarantine the file behind a scan result and flag the result on success.
    pub fn quarantine_scan_result(&self, result: &mut ScanResult) -> QuarantineResult {
        if !result.is_successful() || result.sha256.is_empty() {
            return QuarantineResult::failure(
                result.file_path.clone(),
                result.sha256.clone(),
                "File was not scanned successfully",
            );
        }

        let outcome = self.quarantine(
            &result.file_path,
            &result.sha256,
            result.threat_level,
            &result.threat_name,
        );
        if outcome.success {
            result.is_quarantined = true;
        }
        outcome
    }

    /// Move a quarantined file back to where it came from.
    ///
    /// Returns `false` (and logs) when the metadata is missing or corrupt, the
    /// blob is gone, or something already occupies the original path.
    pub fn restore(&self, digest: &str) -> bool {
        let digest = normalize_digest(digest);
        if !is_valid_digest(&digest) {
            log::warn!("Invalid quarantine digest: {:?}", digest);
            return false;
        }

        let metadata_path = self.metadata_path(&digest);
        let blob_path = self.blob_path(&digest);

        if !metadata_path.exists() {
            log::warn!("Quarantine metadata not found: {}", digest);
            return false;
        }

        let metadata = match QuarantineMetadata::load(&metadata_path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Invalid quarantine metadata {:?}: {}", metadata_path, e);
                return false;
            }
        };

        if !blob_path.is_file() {
            log::warn!("Quarantined file missing for {}", digest);
            return false;
        }

        let target = &metadata.original_path;
        if target.exists() {
            log::warn!("Refusing to restore over existing file {:?}", target);
            return false;
        }

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    log::error!("Failed to recreate {:?}: {}", parent, e);
                    return false;
                }
            }
        }

        if let Err(e) = fs::rename(&blob_path, target) {
            log::error!("Failed to restore {} to {:?}: {}", digest, target, e);
            return false;
        }

        if let Err(e) = fs::remove_file(&metadata_path) {
            log::warn!("Failed to delete metadata after restore: {}", e);
        }

        log::info!("Restored {:?}", target);
        true
    }

    /// All readable metadata records, newest first. Corrupt sidecars are skipped.
    pub fn list(&self) -> Vec<QuarantineMetadata> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to list quarantine {:?}: {}", self.base_path, e);
                return Vec::new();
            }
        };

        let mut items: Vec<QuarantineMetadata> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(METADATA_SUFFIX))
                    .unwrap_or(false)
            })
            .filter_map(|path| match QuarantineMetadata::load(&path) {
                Ok(m) => Some(m),
                Err(e) => {
                    log::warn!("Skipping unreadable metadata {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        items.sort_by(|a, b| b.quarantine_time.cmp(&a.quarantine_time));
        items
    }

    /// Check if a digest has a blob or metadata in the vault.
    pub fn is_quarantined(&self, digest: &str) -> bool {
        let digest = normalize_digest(digest);
        is_valid_digest(&digest)
            && (self.blob_path(&digest).exists() || self.metadata_path(&digest).exists())
    }

    /// Number of readable entries.
    pub fn count(&self) -> usize {
        self.list().len()
    }
}

/// Digests become file names, so only hex is accepted.
fn is_valid_digest(digest: &str) -> bool {
    !digest.is_empty() && digest.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hash::HashCalculator;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        vault: QuarantineVault,
        files_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let vault = QuarantineVault::open(&temp.path().join("vault")).unwrap();
        let files_dir = temp.path().join("files");
        fs::create_dir_all(&files_dir).unwrap();
        Fixture {
            _temp: temp,
            vault,
            files_dir,
        }
    }

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> (PathBuf, String) {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        (path, HashCalculator::sha256_bytes(content))
    }

    #[test]
    fn test_vault_open() {
        let f = fixture();
        assert!(f.vault.base_path().is_dir());
        assert_eq!(f.vault.count(), 0);
        assert!(f.vault.list().is_empty());
    }

    #[test]
    fn test_quarantine_and_restore() {
        let f = fixture();
        let content = b"Malicious content here";
        let (file_path, digest) = create_test_file(&f.files_dir, "malware.exe", content);

        let result = f
            .vault
            .quarantine(&file_path, &digest, ThreatLevel::Malware, "Trojan.Test");

        assert!(result.success, "{:?}", result.error_message);
        assert!(!file_path.exists());
        assert!(f.vault.blob_path(&digest).exists());
        assert_eq!(result.metadata_path, Some(f.vault.metadata_path(&digest)));
        assert!(f.vault.is_quarantined(&digest));

        let listed = f.vault.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_path, file_path);
        assert_eq!(listed[0].threat_name, "Trojan.Test");

        assert!(f.vault.restore(&digest.to_uppercase()));
        assert_eq!(fs::read(&file_path).unwrap(), content);
        assert!(!f.vault.blob_path(&digest).exists());
        assert!(!f.vault.metadata_path(&digest).exists());
        assert_eq!(f.vault.count(), 0);
    }

    #[test]
    fn test_concurrent_quarantine_same_digest() {
        use std::sync::{Arc, Barrier};

        const THREADS: usize = 16;

        let f = fixture();
        let content = b"Same payload dropped in many places";
        let digest = HashCalculator::sha256_bytes(content);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let (path, _) = create_test_file(&f.files_dir, &format!("copy{}.exe", i), content);
                let vault = f.vault.clone();
                let digest = digest.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    vault.quarantine(&path, &digest, ThreatLevel::Malware, "Trojan.Race")
                })
            })
            .collect();

        let outcomes: Vec<QuarantineResult> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&QuarantineResult> = outcomes.iter().filter(|r| r.success).collect();
        assert_eq!(winners.len(), 1);
        for loser in outcomes.iter().filter(|r| !r.success) {
            assert!(loser.original_path.exists());
        }

        let listed = f.vault.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_path, winners[0].original_path);
        assert_eq!(f.vault.count(), 1);

        assert!(f.vault.restore(&digest));
        assert_eq!(fs::read(&winners[0].original_path).unwrap(), content);
        assert_eq!(f.vault.count(), 0);
    }

    #[test]
    fn test_quarantine_duplicate() {
        let f = fixture();
        let content = b"Duplicate content";
        let (file1, digest) = create_test_file(&f.files_dir, "file1.exe", content);
        let (file2, _) = create_test_file(&f.files_dir, "file2.exe", content);

        let first = f.vault.quarantine(&file1, &digest, ThreatLevel::Malware, "Test");
        assert!(first.success);

        let second = f.vault.quarantine(&file2, &digest, ThreatLevel::Malware, "Test");
        assert!(!second.success);
        assert!(second.error_message.unwrap().contains("already quarantined"));

        assert!(file2.exists());
        assert_eq!(fs::read(f.vault.blob_path(&digest)).unwrap(), content);
        assert_eq!(f.vault.list()[0].original_path, file1);
    }

    #[test]
    fn test_quarantine_nonexistent() {
        let f = fixture();
        let result = f.vault.quarantine(
            &f.files_dir.join("missing.exe"),
            "abcdef",
            ThreatLevel::Suspicious,
            "",
        );

        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("File not found"));
        assert!(!f.vault.metadata_path("abcdef").exists());
    }

    #[test]
    fn test_invalid_digest_rejected() {
        let f = fixture();
        let (file_path, _) = create_test_file(&f.files_dir, "a.exe", b"a");

        let result = f
            .vault
            .quarantine(&file_path, "../../escape", ThreatLevel::Malware, "X");
        assert!(!result.success);
        assert!(file_path.exists());
        assert!(!f.vault.restore("../../escape"));
    }

    #[test]
    fn test_restore_without_metadata() {
        let f = fixture();
        fs::write(f.vault.blob_path("abcd"), b"orphan").unwrap();
        assert!(!f.vault.restore("abcd"));
        assert!(f.vault.blob_path("abcd").exists());
    }

    #[test]
    fn test_restore_refuses_overwrite() {
        let f = fixture();
        let (file_path, digest) = create_test_file(&f.files_dir, "dup.exe", b"original");
        assert!(f
            .vault
            .quarantine(&file_path, &digest, ThreatLevel::Malware, "X")
            .success);

        fs::write(&file_path, b"replacement").unwrap();
        assert!(!f.vault.restore(&digest));
        assert_eq!(fs::read(&file_path).unwrap(), b"replacement");
        assert!(f.vault.is_quarantined(&digest));
    }

    #[test]
    fn test_restore_recreates_parent() {
        let f = fixture();
        let nested = f.files_dir.join("deep").join("er");
        fs::create_dir_all(&nested).unwrap();
        let (file_path, digest) = create_test_file(&nested, "x.scr", b"payload");

        assert!(f
            .vault
            .quarantine(&file_path, &digest, ThreatLevel::Suspicious, "Heuristic suspicion")
            .success);
        fs::remove_dir_all(f.files_dir.join("deep")).unwrap();

        assert!(f.vault.restore(&digest));
        assert!(file_path.exists());
    }

    #[test]
    fn test_list_skips_corrupt_metadata() {
        let f = fixture();
        let (file_path, digest) = create_test_file(&f.files_dir, "good.exe", b"good");
        assert!(f
            .vault
            .quarantine(&file_path, &digest, ThreatLevel::Malware, "Good")
            .success);

        fs::write(f.vault.base_path().join("ffff.meta.json"), "{ broken").unwrap();

        let items = f.vault.list();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sha256, digest);
        assert!(!f.vault.restore("ffff"));
    }

    #[test]
    fn test_quarantine_scan_result_sets_flag() {
        let f = fixture();
        let (file_path, digest) = create_test_file(&f.files_dir, "evil.pdf.exe", b"MZ");

        let mut scanned = ScanResult::new(&file_path);
        scanned.sha256 = digest.clone();
        scanned.threat_level = ThreatLevel::Suspicious;
        scanned.threat_name = "Heuristic suspicion".to_string();

        let outcome = f.vault.quarantine_scan_result(&mut scanned);
        assert!(outcome.success);
        assert!(scanned.is_quarantined);
        assert_eq!(f.vault.list()[0].threat_level, ThreatLevel::Suspicious);

        let mut failed = ScanResult::failed(&file_path, "Access denied");
        assert!(!f.vault.quarantine_scan_result(&mut failed).success);
        assert!(!failed.is_quarantined);
    }
}
