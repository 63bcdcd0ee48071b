//! Entropy calculation for detecting packed/encrypted content.
//!
//! High entropy (close to 8.0 for byte data) typically indicates:
//! - Encrypted content
//! - Compressed/packed executables
//! - Random or obfuscated data
//!
//! Plain text sits around 4.0-5.0 and normal executable code between 5.0 and 6.5.

use crate::core::error::{Error, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Entropy at or above which content is treated as packed or encrypted.
pub const ENTROPY_VERY_HIGH: f64 = 7.5;
/// Upper bound for byte data.
pub const ENTROPY_MAX: f64 = 8.0;

const READ_CHUNK: usize = 64 * 1024;

/// Running byte-frequency histogram.
#[derive(Debug, Clone)]
pub struct ByteHistogram {
    counts: [u64; 256],
    total: u64,
}

impl Default for ByteHistogram {
    fn default() -> Self {
        Self {
            counts: [0u64; 256],
            total: 0,
        }
    }
}

impl ByteHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another chunk of data into the histogram.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
        self.total += data.len() as u64;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Shannon entropy in bits per byte.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let len = self.total as f64;
        let mut entropy = 0.0;

        for &count in &self.counts {
            if count > 0 {
                let probability = count as f64 / len;
                entropy -= probability * probability.log2();
            }
        }

        entropy
    }
}

/// Entropy analyzer for detecting packed/encrypted content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropyAnalyzer;

impl EntropyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Calculate Shannon entropy of byte data.
    ///
    /// Returns a value between 0.0 (no randomness) and 8.0 (maximum randomness for bytes).
    pub fn calculate(&self, data: &[u8]) -> f64 {
        let mut histogram = ByteHistogram::new();
        histogram.update(data);
        histogram.entropy()
    }

    /// Stream a whole file through the histogram and return its entropy.
    pub async fn calculate_file(&self, path: &Path) -> Result<f64> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::file_read(path, e))?;
        let mut histogram = ByteHistogram::new();
        let mut buffer = vec![0u8; READ_CHUNK];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::file_read(path, e))?;
            if n == 0 {
                break;
            }
            histogram.update(&buffer[..n]);
        }

        Ok(histogram.entropy())
    }

    /// Whether a value counts as packed/encrypted for the given threshold.
    pub fn is_high(&self, entropy: f64, threshold: f64) -> bool {
        entropy >= threshold
    }
}
