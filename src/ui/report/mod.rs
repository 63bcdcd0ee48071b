//! Scan report generation.
//!
//! Each completed scan is persisted as one versioned JSON document holding the
//! summary and every per-file result.

pub mod models;
pub mod writer;

pub use models::{ReportEntry, ReportSummary, ScanReport, REPORT_VERSION};
pub use writer::ReportWriter;
