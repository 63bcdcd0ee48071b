//! File system scanning.
//!
//! This module provides:
//! - Single-file scan pipeline (hash, signature match, heuristics)
//! - Recursive folder scanning with a bounded worker pool
//! - Cooperative cancellation and progress reporting
//! - The single-flight scan service

pub mod cancel;
pub mod file;
pub mod folder;
pub mod progress;
pub mod service;

pub use cancel::CancellationToken;
pub use file::{FileScanner, HEURISTIC_THREAT_NAME};
pub use folder::FolderScanner;
pub use progress::{ConsoleProgressReporter, ProgressCallback, ProgressReporter, ScanProgress};
pub use service::{ScanService, ScanSettings};
