//! Scan progress snapshots and reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Progress sink. Invoked from worker tasks, so it must be cheap and non-blocking.
pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Point-in-time view of a running scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Files queued for this scan
    pub total_files: u64,
    /// Files finished so far
    pub scanned_files: u64,
    /// Most recently finished file
    pub current_file: Option<PathBuf>,
    /// Suspicious or malware verdicts so far
    pub threats_found: u64,
    /// Human-readable status line
    pub status_message: String,
}

impl ScanProgress {
    pub fn new(total_files: u64, status_message: impl Into<String>) -> Self {
        Self {
            total_files,
            status_message: status_message.into(),
            ..Self::default()
        }
    }

    /// Completion percentage (0 when nothing is queued).
    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        (self.scanned_files as f64 / self.total_files as f64 * 100.0).min(100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.total_files > 0 && self.scanned_files >= self.total_files
    }
}

/// Optional callback wrapper.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    /// Deliver a snapshot, if anyone is listening.
    pub fn report(&self, progress: ScanProgress) {
        if let Some(ref cb) = self.callback {
            cb(progress);
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Console progress reporter.
pub struct ConsoleProgressReporter {
    last_line_length: AtomicUsize,
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self {
            last_line_length: AtomicUsize::new(0),
        }
    }

    /// Wrap into a callback suitable for the scan service.
    pub fn into_callback(self) -> ProgressCallback {
        Arc::new(move |progress| self.report(&progress))
    }

    /// Report progress to console.
    pub fn report(&self, progress: &ScanProgress) {
        let current = progress
            .current_file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let message = format!(
            "\r[{:5.1}%] {}/{} | Threats: {} | {} {}",
            progress.percentage(),
            progress.scanned_files,
            progress.total_files,
            progress.threats_found,
            progress.status_message,
            current
        );

        // Clear previous line and print new one
        let last_len = self.last_line_length.load(Ordering::Relaxed);
        let padding = if message.len() < last_len {
            " ".repeat(last_len - message.len())
        } else {
            String::new()
        };

        eprint!("{}{}", message, padding);
        self.last_line_length.store(message.len(), Ordering::Relaxed);

        if progress.is_complete() {
            eprintln!();
        }
    }
}
