//! Single-file scan pipeline: hash, signature match, heuristics, verdict.

use crate::core::config::DetectionConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{ScanMode, ScanResult, ThreatLevel};
use crate::detection::{HeuristicAnalyzer, SignatureDatabase, SignatureMatcher};
use crate::scanner::cancel::CancellationToken;
use crate::utils::hash::HashCalculator;
use std::path::Path;
use std::sync::Arc;

/// Threat name given to files flagged only by heuristics.
pub const HEURISTIC_THREAT_NAME: &str = "Heuristic suspicion";

/// Scans one file at a time. Shared by every worker of a folder scan.
#[derive(Debug, Clone)]
pub struct FileScanner {
    matcher: SignatureMatcher,
    analyzer: HeuristicAnalyzer,
    fast_threshold: u8,
    full_threshold: u8,
}

impl FileScanner {
    /// Create a scanner over a signature database and detection settings.
    pub fn new(db: Arc<SignatureDatabase>, detection: &DetectionConfig) -> Self {
        Self {
            matcher: SignatureMatcher::new(db),
            analyzer: HeuristicAnalyzer::new(detection),
            fast_threshold: detection.fast_mode_threshold,
            full_threshold: detection.full_mode_threshold,
        }
    }

    /// Risk score at which a file becomes Suspicious in the given mode.
    pub fn threshold(&self, mode: ScanMode) -> u8 {
        match mode {
            ScanMode::Fast => self.fast_threshold,
            ScanMode::Full => self.full_threshold,
        }
    }

    /// Scan a single file.
    ///
    /// Per-file failures are recorded in `error_message` and still return
    /// `Ok`. The only error is `Error::ScanCancelled`, raised before any I/O
    /// when the token is already tripped.
    pub async fn scan_file(
        &self,
        path: &Path,
        mode: ScanMode,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        cancel.check()?;

        let mut result = ScanResult::new(path);

        match self.run_pipeline(path, mode, &mut result).await {
            Ok(()) => {}
            Err(Error::ScanCancelled) => return Err(Error::ScanCancelled),
            Err(e) => {
                let message = failure_message(&e);
                match e {
                    Error::PathNotFound(_) | Error::PermissionDenied { .. } => {
                        log::warn!("{}: {:?}", message, path);
                    }
                    _ => log::error!("Scan failed for {:?}: {}", path, message),
                }
                result.error_message = Some(message);
            }
        }

        Ok(result)
    }

    async fn run_pipeline(
        &self,
        path: &Path,
        mode: ScanMode,
        result: &mut ScanResult,
    ) -> Result<()> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(Error::PathNotFound(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PathNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(Error::file_read(path, e)),
        };
        result.file_size = metadata.len();

        result.sha256 = HashCalculator::sha256_file(path).await?;

        let matched = self.matcher.match_digest(&result.sha256);
        if let Some(signature) = matched.signature {
            log::warn!("Malware detected: {} in {:?}", signature.name, path);
            result.threat_level = ThreatLevel::Malware;
            result.threat_name = signature.name;
            return Ok(());
        }

        let heuristics = self.analyzer.analyze(path, mode.is_full()).await;
        result.risk_score = heuristics.risk_score;
        result.findings = heuristics.findings;

        if result.risk_score >= self.threshold(mode) {
            log::info!(
                "Suspicious file: {:?} (risk {}/100)",
                path,
                result.risk_score
            );
            result.threat_level = ThreatLevel::Suspicious;
            result.threat_name = HEURISTIC_THREAT_NAME.to_string();
        }

        Ok(())
    }
}

/// Message recorded on a failed result.
fn failure_message(err: &Error) -> String {
    match err {
        Error::PathNotFound(_) => "File not found".to_string(),
        Error::PermissionDenied { .. } => "Access denied".to_string(),
        Error::FileRead { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            "File not found".to_string()
        }
        Error::FileRead { source, .. } => format!("I/O error: {}", source),
        Error::Io(msg) => format!("I/O error: {}", msg),
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{HeuristicFindingType, Severity};
    use crate::detection::Signature;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn scanner_with(signatures: Vec<Signature>, detection: &DetectionConfig) -> FileScanner {
        FileScanner::new(
            Arc::new(SignatureDatabase::from_signatures(signatures)),
            detection,
        )
    }

    /// Detection settings with location keywords disabled so scores don't
    /// depend on where the temp directory lives.
    fn location_free() -> DetectionConfig {
        DetectionConfig {
            suspicious_locations: Vec::new(),
            ..DetectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_clean_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "readme.txt", b"just some text");
        let scanner = scanner_with(Vec::new(), &location_free());

        let result = scanner
            .scan_file(&path, ScanMode::Full, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_successful());
        assert_eq!(result.threat_level, ThreatLevel::Clean);
        assert_eq!(result.file_size, 14);
        assert_eq!(result.sha256, HashCalculator::sha256_bytes(b"just some text"));
    }

    #[tokio::test]
    async fn test_signature_match_short_circuits_heuristics() {
        let dir = TempDir::new().unwrap();
        let content = b"not really malware";
        let path = write(&dir, "\u{202E}invoice.pdf.exe", content);
        let signature = Signature::new(
            "Trojan.Fake",
            HashCalculator::sha256_bytes(content),
            Severity::Malware,
        );
        let scanner = scanner_with(vec![signature], &DetectionConfig::default());

        let result = scanner
            .scan_file(&path, ScanMode::Full, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.threat_level, ThreatLevel::Malware);
        assert_eq!(result.threat_name, "Trojan.Fake");
        assert!(result.findings.is_empty());
        assert_eq!(result.risk_score, 0);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "invoice.pdf.exe", b"MZ\x90\x00");
        let scanner = scanner_with(Vec::new(), &DetectionConfig::default());
        let token = CancellationToken::new();

        let first = scanner.scan_file(&path, ScanMode::Full, &token).await.unwrap();
        let second = scanner.scan_file(&path, ScanMode::Full, &token).await.unwrap();

        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.risk_score, second.risk_score);
        assert_eq!(first.findings, second.findings);
        assert_eq!(first.threat_level, second.threat_level);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner_with(Vec::new(), &DetectionConfig::default());

        let result = scanner
            .scan_file(
                &dir.path().join("vanished.exe"),
                ScanMode::Fast,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!result.is_successful());
        assert_eq!(result.error_message.as_deref(), Some("File not found"));
        assert_eq!(result.threat_level, ThreatLevel::Clean);
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner_with(Vec::new(), &DetectionConfig::default());

        let result = scanner
            .scan_file(dir.path(), ScanMode::Fast, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.error_message.as_deref(), Some("File not found"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.txt", b"a");
        let scanner = scanner_with(Vec::new(), &DetectionConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = scanner
            .scan_file(&path, ScanMode::Fast, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_full_mode_is_more_sensitive_than_fast() {
        // non-ASCII name (20) + double extension (35) + script (15) = 70;
        // empty content keeps size and entropy checks out of it.
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ñotes.pdf.js", b"");
        let scanner = scanner_with(Vec::new(), &location_free());
        let token = CancellationToken::new();

        assert_eq!(scanner.threshold(ScanMode::Fast), 80);
        assert_eq!(scanner.threshold(ScanMode::Full), 70);

        let fast = scanner.scan_file(&path, ScanMode::Fast, &token).await.unwrap();
        assert_eq!(fast.risk_score, 70);
        assert_eq!(fast.threat_level, ThreatLevel::Clean);

        let full = scanner.scan_file(&path, ScanMode::Full, &token).await.unwrap();
        assert_eq!(full.risk_score, 70);
        assert_eq!(full.threat_level, ThreatLevel::Suspicious);
        assert_eq!(full.threat_name, HEURISTIC_THREAT_NAME);
        assert!(full
            .findings
            .iter()
            .any(|f| f.finding_type == HeuristicFindingType::DoubleExtension));
    }

    #[test]
    fn test_failure_messages() {
        let denied = Error::permission_denied(
            "/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(failure_message(&denied), "Access denied");

        let io = Error::file_read(
            "/x",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read"),
        );
        assert_eq!(failure_message(&io), "I/O error: short read");

        let other = Error::Internal("boom".into());
        assert_eq!(failure_message(&other), "Error: Internal error: boom");
    }
}
