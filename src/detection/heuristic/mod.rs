//! Heuristic risk scoring for files that matched no signature.
//!
//! Every check is independent and contributes a fixed score when it fires:
//! - Double extension disguise (`invoice.pdf.exe`)
//! - Script extensions
//! - Drop locations such as temp or download folders
//! - Abnormal sizes (huge files, tiny executables)
//! - Hidden files
//! - Non-ASCII or invisible formatting characters in the name
//! - High content entropy (full mode only)
//!
//! A check that cannot complete is logged and skipped, so analysis always
//! produces a result.

pub mod entropy;
pub mod rules;
pub mod scoring;

pub use entropy::{ByteHistogram, EntropyAnalyzer};
pub use rules::HeuristicRules;
pub use scoring::HeuristicResult;

use crate::core::config::DetectionConfig;
use crate::core::types::HeuristicFindingType;
use rules::{final_extension, inner_extension};
use std::fs::Metadata;
use std::path::Path;

const DOUBLE_EXTENSION_SCORE: u8 = 35;
const SCRIPT_EXTENSION_SCORE: u8 = 15;
const LOCATION_SCORE: u8 = 10;
const LARGE_FILE_SCORE: u8 = 5;
const SMALL_EXECUTABLE_SCORE: u8 = 15;
const HIDDEN_FILE_SCORE: u8 = 10;
const SUSPICIOUS_NAME_SCORE: u8 = 20;
const HIGH_ENTROPY_SCORE: u8 = 20;

const MB: u64 = 1024 * 1024;
const KB: u64 = 1024;

/// Heuristic analysis engine.
#[derive(Debug, Clone)]
pub struct HeuristicAnalyzer {
    rules: HeuristicRules,
    entropy: EntropyAnalyzer,
    large_file_bytes: u64,
    small_executable_bytes: u64,
    entropy_threshold: f64,
    entropy_max_bytes: u64,
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}

impl HeuristicAnalyzer {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            rules: HeuristicRules::from_config(config),
            entropy: EntropyAnalyzer::new(),
            large_file_bytes: config.large_file_threshold_mb * MB,
            small_executable_bytes: config.small_executable_threshold_kb * KB,
            entropy_threshold: config.entropy_threshold,
            entropy_max_bytes: config.entropy_max_file_mb * MB,
        }
    }

    pub fn rules(&self) -> &HeuristicRules {
        &self.rules
    }

    /// Analyze a file. `full_mode` enables content entropy analysis.
    pub async fn analyze(&self, path: &Path, full_mode: bool) -> HeuristicResult {
        let mut result = HeuristicResult::new();

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                log::debug!("Heuristics skipped, not a regular file: {:?}", path);
                return result;
            }
            Err(e) => {
                log::warn!("Heuristics skipped for {:?}: {}", path, e);
                return result;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = final_extension(path);
        let size = metadata.len();

        self.check_double_extension(path, extension.as_deref(), &mut result);
        self.check_script_extension(extension.as_deref(), &mut result);
        self.check_location(path, &mut result);
        self.check_size(size, extension.as_deref(), &mut result);
        check_hidden(&file_name, &metadata, &mut result);
        check_file_name(&file_name, &mut result);

        if full_mode {
            self.check_entropy(path, size, &mut result).await;
        }

        if !result.findings.is_empty() {
            log::debug!(
                "Heuristics for {:?}: score {} ({})",
                path,
                result.risk_score,
                result.summary()
            );
        }

        result
    }

    fn check_double_extension(
        &self,
        path: &Path,
        extension: Option<&str>,
        result: &mut HeuristicResult,
    ) {
        let Some(ext) = extension.filter(|e| self.rules.is_dangerous(e)) else {
            return;
        };
        let Some(inner) = inner_extension(path).filter(|e| self.rules.is_spoofed(e)) else {
            return;
        };

        result.add(
            HeuristicFindingType::DoubleExtension,
            format!("Double extension detected: .{}.{}", inner, ext),
            DOUBLE_EXTENSION_SCORE,
        );
    }

    fn check_script_extension(&self, extension: Option<&str>, result: &mut HeuristicResult) {
        if let Some(ext) = extension.filter(|e| self.rules.is_script(e)) {
            result.add(
                HeuristicFindingType::DangerousScriptExtension,
                format!("Script file: .{}", ext),
                SCRIPT_EXTENSION_SCORE,
            );
        }
    }

    fn check_location(&self, path: &Path, result: &mut HeuristicResult) {
        if let Some(keyword) = self.rules.suspicious_location(path) {
            result.add(
                HeuristicFindingType::SuspiciousLocation,
                format!("Suspicious location: path contains '{}'", keyword),
                LOCATION_SCORE,
            );
        }
    }

    fn check_size(&self, size: u64, extension: Option<&str>, result: &mut HeuristicResult) {
        if size > self.large_file_bytes {
            result.add(
                HeuristicFindingType::AbnormalFileSize,
                format!("Very large file: {} MB", size / MB),
                LARGE_FILE_SCORE,
            );
        }

        let dangerous = extension.is_some_and(|e| self.rules.is_dangerous(e));
        if dangerous && size > 0 && size < self.small_executable_bytes {
            result.add(
                HeuristicFindingType::AbnormalFileSize,
                format!("Suspiciously small executable: {} bytes", size),
                SMALL_EXECUTABLE_SCORE,
            );
        }
    }

    async fn check_entropy(&self, path: &Path, size: u64, result: &mut HeuristicResult) {
        if size == 0 || size > self.entropy_max_bytes {
            return;
        }

        match self.entropy.calculate_file(path).await {
            Ok(value) if self.entropy.is_high(value, self.entropy_threshold) => {
                result.add(
                    HeuristicFindingType::HighEntropy,
                    format!("High entropy: {:.2} (possible packing/encryption)", value),
                    HIGH_ENTROPY_SCORE,
                );
            }
            Ok(_) => {}
            Err(e) => log::warn!("Entropy check failed for {:?}: {}", path, e),
        }
    }
}

fn check_hidden(file_name: &str, metadata: &Metadata, result: &mut HeuristicResult) {
    if is_hidden(file_name, metadata) {
        result.add(
            HeuristicFindingType::HiddenFile,
            "Hidden file".to_string(),
            HIDDEN_FILE_SCORE,
        );
    }
}

#[cfg(windows)]
fn is_hidden(_file_name: &str, metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
fn is_hidden(file_name: &str, _metadata: &Metadata) -> bool {
    file_name.starts_with('.')
}

fn check_file_name(file_name: &str, result: &mut HeuristicResult) {
    let description = if file_name.chars().any(is_format_char) {
        "File name contains invisible formatting characters"
    } else if file_name.chars().any(|c| c as u32 > 127) {
        "File name contains non-ASCII characters"
    } else {
        return;
    };

    result.add(
        HeuristicFindingType::SuspiciousFileName,
        description.to_string(),
        SUSPICIOUS_NAME_SCORE,
    );
}

/// Unicode general category Cf (bidi overrides, zero-width joiners, BOM, ...).
fn is_format_char(c: char) -> bool {
    matches!(
        c as u32,
        0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x0890..=0x0891
            | 0x08E2
            | 0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x2064
            | 0x2066..=0x206F
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0x110BD
            | 0x110CD
            | 0x13430..=0x1343F
            | 0x1BCA0..=0x1BCA3
            | 0x1D173..=0x1D17A
            | 0xE0001
            | 0xE0020..=0xE007F
    )
}
