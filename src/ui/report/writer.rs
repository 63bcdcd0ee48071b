//! JSON report persistence.

use crate::core::error::{Error, Result};
use crate::core::types::{ScanResult, ScanSummary};
use crate::ui::report::models::ScanReport;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

const REPORT_PREFIX: &str = "scan_report_";
const REPORT_EXTENSION: &str = "json";

/// Writes one report file per completed scan into a directory.
#[derive(Debug)]
pub struct ReportWriter {
    reports_dir: PathBuf,
    last_written: Mutex<Option<PathBuf>>,
}

impl ReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            last_written: Mutex::new(None),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Path of the report most recently written by this writer.
    pub fn last_written(&self) -> Option<PathBuf> {
        self.last_written
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Serialize a scan to a new, uniquely named file and return its path.
    pub async fn write(&self, summary: &ScanSummary, results: &[ScanResult]) -> Result<PathBuf> {
        let report = ScanReport::new(summary, results);
        let json = serde_json::to_vec_pretty(&report)?;

        tokio::fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| Error::ReportWrite(format!("{:?}: {}", self.reports_dir, e)))?;

        let stamp = summary
            .end_time
            .unwrap_or_else(Utc::now)
            .format("%Y%m%d_%H%M%S_%3f")
            .to_string();

        let mut attempt = 0u32;
        let (path, mut file) = loop {
            let name = if attempt == 0 {
                format!("{}{}.{}", REPORT_PREFIX, stamp, REPORT_EXTENSION)
            } else {
                format!("{}{}_{}.{}", REPORT_PREFIX, stamp, attempt, REPORT_EXTENSION)
            };
            let path = self.reports_dir.join(name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(Error::ReportWrite(format!("{:?}: {}", path, e))),
            }
        };

        file.write_all(&json)
            .await
            .map_err(|e| Error::ReportWrite(format!("{:?}: {}", path, e)))?;
        file.flush()
            .await
            .map_err(|e| Error::ReportWrite(format!("{:?}: {}", path, e)))?;

        log::info!("Scan report written to {:?}", path);

        match self.last_written.lock() {
            Ok(mut last) => *last = Some(path.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(path.clone()),
        }

        Ok(path)
    }

    /// Load a report, distinguishing a missing file from an unreadable one.
    pub fn load(&self, path: &Path) -> Result<ScanReport> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::PathNotFound(path.to_path_buf()),
            _ => Error::file_read(path, e),
        })?;

        serde_json::from_str(&content).map_err(|e| Error::ReportRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load a report. Missing or corrupt files are logged and yield `None`.
    pub fn read(&self, path: &Path) -> Option<ScanReport> {
        match self.load(path) {
            Ok(report) => Some(report),
            Err(e) => {
                log::warn!("Failed to read report {:?}: {}", path, e);
                None
            }
        }
    }

    /// Report files in the directory, newest first.
    pub fn list_reports(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.reports_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("No reports in {:?}: {}", self.reports_dir, e);
                return Vec::new();
            }
        };

        let mut reports: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_report_file(path))
            .collect();

        // Timestamped names sort chronologically.
        reports.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        reports
    }

    /// Newest report on disk.
    pub fn last_report(&self) -> Option<PathBuf> {
        self.list_reports().into_iter().next()
    }
}

fn is_report_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(REPORT_PREFIX))
        .unwrap_or(false);
    let ext_ok = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case(REPORT_EXTENSION))
        .unwrap_or(false);
    name_ok && ext_ok && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ScanMode, ThreatLevel};
    use tempfile::tempdir;

    fn finished_summary(results: &[ScanResult]) -> ScanSummary {
        let mut summary = ScanSummary::new("/scan/root", ScanMode::Fast);
        for r in results {
            summary.record(r);
        }
        summary.finish();
        summary
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));

        let mut malware = ScanResult::new("/scan/root/dropper.exe");
        malware.threat_level = ThreatLevel::Malware;
        malware.threat_name = "Trojan.Dropper".to_string();
        let results = vec![ScanResult::new("/scan/root/a.txt"), malware];
        let summary = finished_summary(&results);

        let path = writer.write(&summary, &results).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_report_"));
        assert!(name.ends_with(".json"));
        assert_eq!(writer.last_written(), Some(path.clone()));

        let report = writer.read(&path).unwrap();
        assert_eq!(report.report_version, "1.0");
        assert_eq!(report.summary.summary.malware_files, 1);
        assert_eq!(report.results[1].result.threat_name, "Trojan.Dropper");
    }

    #[tokio::test]
    async fn test_same_timestamp_gets_unique_names() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let summary = finished_summary(&[]);

        let first = writer.write(&summary, &[]).await.unwrap();
        let second = writer.write(&summary, &[]).await.unwrap();

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("_1.json"));
        assert_eq!(writer.list_reports(), vec![second.clone(), first]);
        assert_eq!(writer.last_report(), Some(second));
    }

    #[test]
    fn test_read_missing_or_corrupt() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        assert!(writer.read(&dir.path().join("nope.json")).is_none());

        let corrupt = dir.path().join("scan_report_corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(writer.read(&corrupt).is_none());
    }

    #[test]
    fn test_load_errors_are_read_errors() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let missing = writer.load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, Error::PathNotFound(_)));

        let corrupt = dir.path().join("scan_report_corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        let err = writer.load(&corrupt).unwrap_err();
        assert!(matches!(err, Error::ReportRead { .. }));
        assert_eq!(err.category(), crate::core::error::ErrorCategory::Reporting);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_list_ignores_other_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("scan_report_20240101_000000_000.txt"), "").unwrap();
        std::fs::write(dir.path().join("scan_report_20240101_000000_000.json"), "{}").unwrap();
        std::fs::write(dir.path().join("scan_report_20250101_000000_000.json"), "{}").unwrap();

        let writer = ReportWriter::new(dir.path());
        let names: Vec<String> = writer
            .list_reports()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "scan_report_20250101_000000_000.json",
                "scan_report_20240101_000000_000.json"
            ]
        );

        assert!(ReportWriter::new(dir.path().join("missing"))
            .list_reports()
            .is_empty());
    }
}
