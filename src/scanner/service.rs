//! Scan service: the single entry point callers drive scans through.
//!
//! Owns the signature database, the per-scan settings and the record of the
//! last completed scan. Only one scan runs at a time; a second request while
//! one is active is rejected with `Error::ScanInProgress`.

use crate::core::config::{validate_parallelism, Config};
use crate::core::error::{Error, Result};
use crate::core::types::{ScanMode, ScanResult, ScanSummary};
use crate::detection::SignatureDatabase;
use crate::scanner::cancel::CancellationToken;
use crate::scanner::file::FileScanner;
use crate::scanner::folder::FolderScanner;
use crate::scanner::progress::{ProgressCallback, ProgressReporter, ScanProgress};
use crate::ui::report::ReportWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Settings frozen at the start of each scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub mode: ScanMode,
    pub exclude_patterns: Vec<String>,
    pub max_parallelism: usize,
}

impl From<&Config> for ScanSettings {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.scan.mode,
            exclude_patterns: config.scan.exclude_patterns.clone(),
            max_parallelism: config.scan.max_parallelism,
        }
    }
}

#[derive(Debug, Default)]
struct LastScan {
    results: Vec<ScanResult>,
    summary: Option<ScanSummary>,
    report_path: Option<PathBuf>,
}

/// Clears the scanning flag when a scan ends, however it ends.
struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Top-level scan façade.
pub struct ScanService {
    config: Config,
    database: Arc<SignatureDatabase>,
    scanner: Arc<FileScanner>,
    reports: ReportWriter,
    settings: RwLock<ScanSettings>,
    scanning: AtomicBool,
    current_cancel: Mutex<Option<CancellationToken>>,
    last: Mutex<LastScan>,
}

impl ScanService {
    /// Create a service. Signatures are not loaded until [`initialize`](Self::initialize).
    pub fn new(config: Config) -> Result<Self> {
        validate_parallelism(config.scan.max_parallelism)?;

        let database = Arc::new(SignatureDatabase::new());
        let scanner = Arc::new(FileScanner::new(Arc::clone(&database), &config.detection));

        Ok(Self {
            database,
            scanner,
            reports: ReportWriter::new(config.paths.reports_dir()),
            settings: RwLock::new(ScanSettings::from(&config)),
            scanning: AtomicBool::new(false),
            current_cancel: Mutex::new(None),
            last: Mutex::new(LastScan::default()),
            config,
        })
    }

    /// Create data directories and load the signature database.
    pub async fn initialize(&self) -> Result<()> {
        self.config.ensure_directories()?;
        let count = self
            .database
            .load(&self.config.paths.signatures_file())
            .await;
        log::info!("Scan service ready ({} signatures)", count);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Arc<SignatureDatabase> {
        &self.database
    }

    // ===== Settings =====

    /// Snapshot of the current settings.
    pub fn settings(&self) -> ScanSettings {
        match self.settings.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_mode(&self, mode: ScanMode) {
        self.update_settings(|s| s.mode = mode);
    }

    pub fn set_exclude_patterns(&self, patterns: Vec<String>) {
        self.update_settings(|s| s.exclude_patterns = patterns);
    }

    /// Change the worker bound. Values outside 1..=8 are rejected and the
    /// previous value kept.
    pub fn set_max_parallelism(&self, value: usize) -> Result<()> {
        validate_parallelism(value)?;
        self.update_settings(|s| s.max_parallelism = value);
        Ok(())
    }

    fn update_settings(&self, apply: impl FnOnce(&mut ScanSettings)) {
        match self.settings.write() {
            Ok(mut s) => apply(&mut s),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }

    // ===== Scanning =====

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Request cancellation of the running scan, if any.
    pub fn cancel(&self) {
        let current = match self.current_cancel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(token) = current.as_ref() {
            if self.is_scanning() && !token.is_cancelled() {
                log::info!("Scan cancellation requested");
                token.cancel();
            }
        }
    }

    /// Scan one file and record it as a completed scan.
    pub async fn scan_file(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<(ScanResult, ScanSummary)> {
        let (_guard, cancel, settings) = self.begin_scan()?;
        let reporter = ProgressReporter::new(progress);

        log::info!("Scanning file {:?} ({} mode)", path, settings.mode);
        let mut tick = ScanProgress::new(1, "Scanning file...");
        tick.current_file = Some(path.to_path_buf());
        reporter.report(tick);

        let result = self.scanner.scan_file(path, settings.mode, &cancel).await?;

        let mut summary = ScanSummary::new(path, settings.mode);
        summary.record(&result);
        summary.finish();

        let results = vec![result.clone()];
        self.complete_scan(&summary, results).await;

        let mut done = ScanProgress::new(1, "Scan completed.");
        done.scanned_files = 1;
        done.current_file = Some(path.to_path_buf());
        done.threats_found = summary.total_threats();
        reporter.report(done);

        Ok((result, summary))
    }

    /// Scan a directory tree and record it as a completed scan.
    pub async fn scan_folder(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<(Vec<ScanResult>, ScanSummary)> {
        let (_guard, cancel, settings) = self.begin_scan()?;
        let reporter = ProgressReporter::new(progress);

        let folder = FolderScanner::new(
            Arc::clone(&self.scanner),
            &settings.exclude_patterns,
            settings.max_parallelism,
        )?;

        log::info!("Scanning folder {:?} ({} mode)", path, settings.mode);
        reporter.report(ScanProgress::new(0, "Listing files..."));

        let mut summary = ScanSummary::new(path, settings.mode);
        let results = folder
            .scan_folder(path, settings.mode, &cancel, reporter.clone())
            .await?;

        for result in &results {
            summary.record(result);
        }
        summary.finish();

        log::info!(
            "Scan completed: {} files, {} threats, {} errors in {}",
            summary.total_files_scanned,
            summary.total_threats(),
            summary.error_files,
            summary.formatted_duration()
        );

        self.complete_scan(&summary, results.clone()).await;

        let total = results.len() as u64;
        let mut done = ScanProgress::new(total, "Scan completed.");
        done.scanned_files = total;
        done.threats_found = summary.total_threats();
        reporter.report(done);

        Ok((results, summary))
    }

    /// Claim the single-flight slot and freeze settings for one scan.
    fn begin_scan(&self) -> Result<(ScanGuard<'_>, CancellationToken, ScanSettings)> {
        // Flag and token change together so cancel() never sees one without the other.
        let mut current = match self.current_cancel.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Scan rejected: another scan is in progress");
            return Err(Error::ScanInProgress);
        }
        let guard = ScanGuard {
            flag: &self.scanning,
        };

        let token = CancellationToken::new();
        *current = Some(token.clone());
        drop(current);

        Ok((guard, token, self.settings()))
    }

    /// Persist the report and remember the scan. Report failures are logged only.
    async fn complete_scan(&self, summary: &ScanSummary, results: Vec<ScanResult>) {
        let report_path = match self.reports.write(summary, &results).await {
            Ok(path) => Some(path),
            Err(e) => {
                log::error!("Failed to write scan report: {}", e);
                None
            }
        };

        let mut last = self.last_scan();
        last.results = results;
        last.summary = Some(summary.clone());
        if report_path.is_some() {
            last.report_path = report_path;
        }
    }

    // ===== Last scan =====

    fn last_scan(&self) -> MutexGuard<'_, LastScan> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn last_results(&self) -> Vec<ScanResult> {
        self.last_scan().results.clone()
    }

    pub fn last_summary(&self) -> Option<ScanSummary> {
        self.last_scan().summary.clone()
    }

    pub fn last_report_path(&self) -> Option<PathBuf> {
        self.last_scan().report_path.clone()
    }

    pub fn reports_dir(&self) -> &Path {
        self.reports.reports_dir()
    }

    pub fn report_writer(&self) -> &ReportWriter {
        &self.reports
    }

    /// Flag a result of the last scan as quarantined. Returns false if the
    /// path is not among the last results.
    pub fn mark_quarantined(&self, path: &Path) -> bool {
        let mut last = self.last_scan();
        match last.results.iter_mut().find(|r| r.file_path == path) {
            Some(result) => {
                result.is_quarantined = true;
                true
            }
            None => false,
        }
    }
}
