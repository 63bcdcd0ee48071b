//! User interface components.
//!
//! This module provides:
//! - CLI definition
//! - Scan report persistence (JSON)

pub mod cli;
pub mod report;

pub use cli::Cli;
pub use report::{ReportWriter, ScanReport};
