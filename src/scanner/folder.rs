//! Recursive folder scan with bounded parallelism.

use crate::core::config::validate_parallelism;
use crate::core::error::{Error, Result};
use crate::core::types::{ScanMode, ScanResult};
use crate::scanner::cancel::CancellationToken;
use crate::scanner::file::FileScanner;
use crate::scanner::progress::{ProgressReporter, ScanProgress};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

/// Shared state mutated by workers. Hold time is one push plus a few counters.
struct FolderState {
    results: Vec<ScanResult>,
    progress: ScanProgress,
}

/// Walks a directory tree and fans file scans out over a semaphore-gated pool.
#[derive(Debug, Clone)]
pub struct FolderScanner {
    scanner: Arc<FileScanner>,
    exclude_patterns: Arc<Vec<String>>,
    max_parallelism: usize,
}

impl FolderScanner {
    /// Create a folder scanner. Fails if `max_parallelism` is outside 1..=8.
    pub fn new(
        scanner: Arc<FileScanner>,
        exclude_patterns: &[String],
        max_parallelism: usize,
    ) -> Result<Self> {
        validate_parallelism(max_parallelism)?;

        let exclude_patterns = exclude_patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            scanner,
            exclude_patterns: Arc::new(exclude_patterns),
            max_parallelism,
        })
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Check whether a file or directory name matches an exclusion pattern.
    pub fn should_exclude(&self, name: &str) -> bool {
        is_excluded(&self.exclude_patterns, name)
    }

    /// Enumerate every file under `root`, pruning excluded directories.
    ///
    /// A missing root is logged and yields an empty list. Unreadable entries
    /// are skipped.
    pub async fn collect_files(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            log::warn!("Directory not found, skipping: {:?}", root);
            return Ok(Vec::new());
        }

        let root = root.to_path_buf();
        let patterns = Arc::clone(&self.exclude_patterns);
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || walk(&root, &patterns, &cancel)).await?
    }

    /// Scan every file under `root`.
    ///
    /// Results come back in completion order. Once `cancel` trips no new file
    /// scans start and the call returns `Error::ScanCancelled` instead of the
    /// partial list.
    pub async fn scan_folder(
        &self,
        root: &Path,
        mode: ScanMode,
        cancel: &CancellationToken,
        progress: ProgressReporter,
    ) -> Result<Vec<ScanResult>> {
        let files = self.collect_files(root, cancel).await?;
        let total = files.len() as u64;

        log::info!(
            "Found {} files to scan in {:?} ({} mode, {} workers)",
            total,
            root,
            mode,
            self.max_parallelism
        );
        progress.report(ScanProgress::new(total, format!("Found {} files", total)));

        let state = Arc::new(Mutex::new(FolderState {
            results: Vec::with_capacity(files.len()),
            progress: ScanProgress::new(total, "Scanning"),
        }));
        let semaphore = Arc::new(Semaphore::new(self.max_parallelism));
        let mut workers = JoinSet::new();

        for path in files {
            if cancel.is_cancelled() {
                break;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(format!("Scan pool closed: {}", e)))?;

            if cancel.is_cancelled() {
                break;
            }

            let scanner = Arc::clone(&self.scanner);
            let state = Arc::clone(&state);
            let progress = progress.clone();
            let cancel = cancel.clone();

            workers.spawn(async move {
                let _permit = permit;

                let result = match scanner.scan_file(&path, mode, &cancel).await {
                    Ok(result) => result,
                    Err(_) => return,
                };

                let snapshot = {
                    let mut state = match state.lock() {
                        Ok(state) => state,
                        Err(_) => {
                            log::error!("{}", Error::lock_poisoned("folder scan state"));
                            return;
                        }
                    };
                    state.progress.scanned_files += 1;
                    if result.is_threat() {
                        state.progress.threats_found += 1;
                    }
                    state.progress.current_file = Some(result.file_path.clone());
                    state.progress.status_message = format!("Scanned {}", result.file_name());
                    state.results.push(result);
                    state.progress.clone()
                };

                progress.report(snapshot);
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("Scan worker failed: {}", e);
            }
        }

        if cancel.is_cancelled() {
            log::info!("Folder scan cancelled: {:?}", root);
            return Err(Error::ScanCancelled);
        }

        let mut state = state
            .lock()
            .map_err(|_| Error::lock_poisoned("folder scan state"))?;
        let results = std::mem::take(&mut state.results);

        let mut done = state.progress.clone();
        done.current_file = None;
        done.status_message = "All files scanned".to_string();
        drop(state);
        progress.report(done);

        Ok(results)
    }
}

fn is_excluded(patterns: &[String], name: &str) -> bool {
    let name = name.to_lowercase();
    patterns.iter().any(|p| name.contains(p.as_str()))
}

fn walk(root: &Path, patterns: &[String], cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !is_excluded(patterns, &e.file_name().to_string_lossy())
        });

    let mut files = Vec::new();

    for entry in walker {
        cancel.check()?;

        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DetectionConfig;
    use crate::core::types::ThreatLevel;
    use crate::detection::SignatureDatabase;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    fn file_scanner() -> Arc<FileScanner> {
        Arc::new(FileScanner::new(
            Arc::new(SignatureDatabase::new()),
            &DetectionConfig::default(),
        ))
    }

    fn folder_scanner(patterns: &[&str], parallelism: usize) -> FolderScanner {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        FolderScanner::new(file_scanner(), &patterns, parallelism).unwrap()
    }

    fn populate(dir: &TempDir, count: usize) {
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        for i in 0..count {
            let target = if i % 2 == 0 { dir.path() } else { nested.as_path() };
            std::fs::write(target.join(format!("file{}.txt", i)), format!("content {}", i))
                .unwrap();
        }
        std::fs::write(dir.path().join("report.pdf.exe"), b"MZ").unwrap();
    }

    fn fingerprint(results: &[ScanResult]) -> Vec<(PathBuf, String, u8, ThreatLevel)> {
        let mut rows: Vec<_> = results
            .iter()
            .map(|r| (r.file_path.clone(), r.sha256.clone(), r.risk_score, r.threat_level))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    #[test]
    fn test_parallelism_bounds() {
        let patterns = Vec::new();
        assert!(FolderScanner::new(file_scanner(), &patterns, 0).is_err());
        assert!(FolderScanner::new(file_scanner(), &patterns, 9).is_err());
        assert!(FolderScanner::new(file_scanner(), &patterns, 1).is_ok());
        assert_eq!(
            FolderScanner::new(file_scanner(), &patterns, 8)
                .unwrap()
                .max_parallelism(),
            8
        );
    }

    #[test]
    fn test_should_exclude() {
        let scanner = folder_scanner(&["node_modules", ".GIT", "bin"], 1);
        assert!(scanner.should_exclude("node_modules"));
        assert!(scanner.should_exclude(".git"));
        assert!(scanner.should_exclude("Bin"));
        assert!(scanner.should_exclude("cabinet.txt"));
        assert!(!scanner.should_exclude("src"));
    }

    #[tokio::test]
    async fn test_parallelism_does_not_change_results() {
        let dir = TempDir::new().unwrap();
        populate(&dir, 24);
        let token = CancellationToken::new();

        let serial = folder_scanner(&[], 1)
            .scan_folder(dir.path(), ScanMode::Full, &token, ProgressReporter::default())
            .await
            .unwrap();
        let parallel = folder_scanner(&[], 8)
            .scan_folder(dir.path(), ScanMode::Full, &token, ProgressReporter::default())
            .await
            .unwrap();

        assert_eq!(serial.len(), 25);
        assert_eq!(fingerprint(&serial), fingerprint(&parallel));
    }

    #[tokio::test]
    async fn test_excluded_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        let modules = dir.path().join("node_modules").join("left-pad");
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::write(modules.join("index.js"), b"module.exports = 1;").unwrap();
        std::fs::write(dir.path().join("main.txt"), b"hello").unwrap();

        let results = folder_scanner(&["node_modules"], 2)
            .scan_folder(
                dir.path(),
                ScanMode::Fast,
                &CancellationToken::new(),
                ProgressReporter::default(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name(), "main.txt");
    }

    #[tokio::test]
    async fn test_missing_root_yields_empty() {
        let dir = TempDir::new().unwrap();
        let results = folder_scanner(&[], 4)
            .scan_folder(
                &dir.path().join("gone"),
                ScanMode::Fast,
                &CancellationToken::new(),
                ProgressReporter::default(),
            )
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_progress_ticks() {
        let dir = TempDir::new().unwrap();
        populate(&dir, 5);

        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let reporter = ProgressReporter::new(Some(Arc::new(move |p: ScanProgress| {
            sink.lock().unwrap().push(p);
        })));

        folder_scanner(&[], 3)
            .scan_folder(dir.path(), ScanMode::Full, &CancellationToken::new(), reporter)
            .await
            .unwrap();

        let ticks = ticks.lock().unwrap();
        assert_eq!(ticks.first().unwrap().status_message, "Found 6 files");
        let last = ticks.last().unwrap();
        assert_eq!(last.status_message, "All files scanned");
        assert_eq!(last.scanned_files, 6);
        assert!(last.is_complete());
    }

    #[tokio::test]
    async fn test_cancel_mid_scan_is_not_a_partial_list() {
        let dir = TempDir::new().unwrap();
        populate(&dir, 40);

        let token = CancellationToken::new();
        let trip = token.clone();
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let reporter = ProgressReporter::new(Some(Arc::new(move |p: ScanProgress| {
            counter.store(p.scanned_files, Ordering::SeqCst);
            if p.scanned_files >= 3 {
                trip.cancel();
            }
        })));

        let outcome = folder_scanner(&[], 1)
            .scan_folder(dir.path(), ScanMode::Fast, &token, reporter)
            .await;

        assert!(outcome.unwrap_err().is_cancelled());
        assert!(seen.load(Ordering::SeqCst) < 41);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        populate(&dir, 3);
        let token = CancellationToken::new();
        token.cancel();

        let err = folder_scanner(&[], 4)
            .scan_folder(dir.path(), ScanMode::Fast, &token, ProgressReporter::default())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
