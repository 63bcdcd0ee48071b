//! Malware detection engines.
//!
//! This module provides:
//! - Signature-based detection (SHA256 lookup)
//! - Heuristic analysis (extensions, location, size, name, entropy)

pub mod database;
pub mod heuristic;
pub mod matcher;
pub mod signature;

pub use database::SignatureDatabase;
pub use heuristic::{HeuristicAnalyzer, HeuristicResult};
pub use matcher::{MatchResult, SignatureMatcher};
pub use signature::{Signature, SignatureFile};
