//! Quarantine store management.
//!
//! A quarantined file is moved (never copied) into the store under
//! `<digest>.quarantine`, next to a `<digest>.meta.json` sidecar recording
//! where it came from. The pair is the unit of restore.

pub mod metadata;
pub mod vault;

use serde::Serialize;
use std::path::PathBuf;

pub use metadata::QuarantineMetadata;
pub use vault::QuarantineVault;

/// Extension of a quarantined blob.
pub const BLOB_EXTENSION: &str = "quarantine";

/// Suffix of a metadata sidecar.
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Outcome of a quarantine attempt. Expected failures land here, not in `Err`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineResult {
    pub success: bool,
    pub original_path: PathBuf,
    pub quarantine_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
    pub sha256: String,
    pub error_message: Option<String>,
}

impl QuarantineResult {
    /// Create a success result.
    pub fn success(
        original_path: PathBuf,
        sha256: String,
        quarantine_path: PathBuf,
        metadata_path: PathBuf,
    ) -> Self {
        Self {
            success: true,
            original_path,
            quarantine_path: Some(quarantine_path),
            metadata_path: Some(metadata_path),
            sha256,
            error_message: None,
        }
    }

    /// Create a failure result.
    pub fn failure(original_path: PathBuf, sha256: String, message: impl Into<String>) -> Self {
        Self {
            success: false,
            original_path,
            sha256,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}
