//! Sidecar metadata for quarantined items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};
use crate::core::types::ThreatLevel;

/// Where a quarantined file came from and why it was isolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineMetadata {
    /// Location the file is restored to
    pub original_path: PathBuf,
    pub original_file_name: String,
    /// Lowercase hex SHA-256 of the content, also the store key
    pub sha256: String,
    pub quarantine_time: DateTime<Utc>,
    pub threat_level: ThreatLevel,
    #[serde(default)]
    pub threat_name: String,
}

impl QuarantineMetadata {
    /// Create metadata for a file being quarantined now.
    pub fn new(
        original_path: &Path,
        sha256: impl Into<String>,
        threat_level: ThreatLevel,
        threat_name: impl Into<String>,
    ) -> Self {
        let original_file_name = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            original_path: original_path.to_path_buf(),
            original_file_name,
            sha256: sha256.into(),
            quarantine_time: Utc::now(),
            threat_level,
            threat_name: threat_name.into(),
        }
    }

    /// Read a sidecar. A blank original path counts as corrupt.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let metadata: Self = serde_json::from_str(&content)?;

        if metadata.original_path.as_os_str().is_empty() {
            return Err(Error::QuarantineFailed {
                path: path.to_path_buf(),
                reason: "Metadata has no original path".to_string(),
            });
        }

        Ok(metadata)
    }

    /// Write a sidecar, failing if one already exists at `path`.
    ///
    /// A failed write removes the partial file so the digest is not left
    /// looking quarantined.
    pub fn save_new(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        create_new_with(path, |file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        })
    }
}

fn create_new_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| Error::file_write(path, e))?;

    if let Err(e) = write(&mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            log::warn!("Failed to remove partial metadata {:?}: {}", path, cleanup);
        }
        return Err(Error::file_write(path, e));
    }

    Ok(())
}
