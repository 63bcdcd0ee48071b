//! VirusGuard: an on-demand file scanning engine.
//!
//! This crate hashes files, matches them against a signature database, scores
//! them with metadata and entropy heuristics, scans directory trees with a
//! bounded worker pool, quarantines flagged files and writes JSON reports.

pub mod core;
pub mod detection;
pub mod quarantine;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
pub use crate::scanner::{CancellationToken, ScanService};
