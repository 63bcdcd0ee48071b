//! Content hashing.

use crate::core::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

/// Buffer size for streaming reads (80KB).
const BUFFER_SIZE: usize = 80 * 1024;

/// Hash calculator for files.
pub struct HashCalculator;

impl HashCalculator {
    /// Calculate the SHA256 hash of a file as lowercase hex.
    ///
    /// The file is streamed through a fixed buffer, so arbitrarily large
    /// files hash in constant memory.
    pub async fn sha256_file(path: &Path) -> Result<String> {
        let file = File::open(path)
            .await
            .map_err(|e| Error::file_read(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| Error::file_read(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Calculate SHA256 hash of bytes.
    pub fn sha256_bytes(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Verify a file matches an expected SHA256 hash.
    pub async fn verify_sha256(path: &Path, expected: &str) -> Result<bool> {
        let actual = Self::sha256_file(path).await?;
        Ok(actual.eq_ignore_ascii_case(expected.trim()))
    }
}
