//! Configuration, error handling and the value types shared by every scan.

pub mod config;
pub mod error;
pub mod types;

pub use config::{validate_parallelism, Config};
pub use error::{Error, ErrorCategory, Result};
pub use types::{ScanMode, ScanResult, ScanSummary, ThreatLevel};
