//! Core type definitions used throughout VirusGuard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scan depth selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Metadata heuristics only; higher bar before flagging
    #[default]
    Fast,
    /// Adds content entropy analysis; lower bar before flagging
    Full,
}

impl ScanMode {
    /// Whether content-reading heuristics are enabled.
    pub fn is_full(&self) -> bool {
        matches!(self, ScanMode::Full)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Fast => "fast",
            ScanMode::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast" | "quick" => Some(ScanMode::Fast),
            "full" | "deep" => Some(ScanMode::Full),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Fast => write!(f, "Fast"),
            ScanMode::Full => write!(f, "Full"),
        }
    }
}

/// Final verdict for a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    /// Nothing matched and the heuristic score stayed below threshold
    #[default]
    Clean,
    /// Heuristic score reached the active threshold
    Suspicious,
    /// Content digest matched a known signature
    Malware,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Clean => "clean",
            ThreatLevel::Suspicious => "suspicious",
            ThreatLevel::Malware => "malware",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clean" => Some(ThreatLevel::Clean),
            "suspicious" => Some(ThreatLevel::Suspicious),
            "malware" => Some(ThreatLevel::Malware),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatLevel::Clean => write!(f, "Clean"),
            ThreatLevel::Suspicious => write!(f, "Suspicious"),
            ThreatLevel::Malware => write!(f, "Malware"),
        }
    }
}

/// Severity attached to a known signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Confirmed malicious code
    Malware,
    /// Potentially unwanted program
    Pup,
    /// Advertising software
    Adware,
    /// Unclassified
    #[default]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Malware => "malware",
            Severity::Pup => "pup",
            Severity::Adware => "adware",
            Severity::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "malware" => Some(Severity::Malware),
            "pup" => Some(Severity::Pup),
            "adware" => Some(Severity::Adware),
            "unknown" => Some(Severity::Unknown),
            _ => None,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from_str(&s).unwrap_or_default()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Malware => write!(f, "Malware"),
            Severity::Pup => write!(f, "PUP"),
            Severity::Adware => write!(f, "Adware"),
            Severity::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Informational bucket for a heuristic risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a score: >=70 High, >=40 Medium, >=20 Low.
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => RiskLevel::High,
            40..=69 => RiskLevel::Medium,
            20..=39 => RiskLevel::Low,
            _ => RiskLevel::None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::None => write!(f, "None"),
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Kind of heuristic signal that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicFindingType {
    DoubleExtension,
    DangerousScriptExtension,
    SuspiciousLocation,
    AbnormalFileSize,
    HighEntropy,
    HiddenFile,
    SuspiciousFileName,
}

impl std::fmt::Display for HeuristicFindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeuristicFindingType::DoubleExtension => write!(f, "Double Extension"),
            HeuristicFindingType::DangerousScriptExtension => write!(f, "Script Extension"),
            HeuristicFindingType::SuspiciousLocation => write!(f, "Suspicious Location"),
            HeuristicFindingType::AbnormalFileSize => write!(f, "Abnormal Size"),
            HeuristicFindingType::HighEntropy => write!(f, "High Entropy"),
            HeuristicFindingType::HiddenFile => write!(f, "Hidden File"),
            HeuristicFindingType::SuspiciousFileName => write!(f, "Suspicious Name"),
        }
    }
}

/// One triggered heuristic signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicFinding {
    #[serde(rename = "type")]
    pub finding_type: HeuristicFindingType,
    pub description: String,
    pub risk_contribution: u8,
}

impl HeuristicFinding {
    pub fn new(
        finding_type: HeuristicFindingType,
        description: impl Into<String>,
        risk_contribution: u8,
    ) -> Self {
        Self {
            finding_type,
            description: description.into(),
            risk_contribution,
        }
    }
}

/// Outcome of scanning a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub file_path: PathBuf,
    pub file_size: u64,
    /// Lowercase hex SHA-256, empty when hashing never happened
    pub sha256: String,
    pub threat_level: ThreatLevel,
    pub threat_name: String,
    pub risk_score: u8,
    pub findings: Vec<HeuristicFinding>,
    pub scan_time: DateTime<Utc>,
    pub error_message: Option<String>,
    pub is_quarantined: bool,
}

impl ScanResult {
    /// Create an empty (clean) result for a path, stamped with the current time.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            file_size: 0,
            sha256: String::new(),
            threat_level: ThreatLevel::Clean,
            threat_name: String::new(),
            risk_score: 0,
            findings: Vec::new(),
            scan_time: Utc::now(),
            error_message: None,
            is_quarantined: false,
        }
    }

    /// Create a failed result carrying an error message.
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        let mut result = Self::new(path);
        result.error_message = Some(message.into());
        result
    }

    /// File name component of the path.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.to_string_lossy().into_owned())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// A scan is successful when no error was recorded.
    pub fn is_successful(&self) -> bool {
        self.error_message.is_none()
    }

    /// Suspicious or Malware.
    pub fn is_threat(&self) -> bool {
        self.threat_level != ThreatLevel::Clean
    }

    /// One-line human readable verdict.
    pub fn summary(&self) -> String {
        if let Some(ref error) = self.error_message {
            return format!("Error: {}", error);
        }

        match self.threat_level {
            ThreatLevel::Malware => format!("Malware: {}", self.threat_name),
            ThreatLevel::Suspicious => {
                let reasons: Vec<&str> =
                    self.findings.iter().map(|f| f.description.as_str()).collect();
                format!(
                    "Suspicious (risk {}/100): {}",
                    self.risk_score,
                    reasons.join("; ")
                )
            }
            ThreatLevel::Clean => "Clean".to_string(),
        }
    }
}

/// Summary of a completed scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Unique scan identifier
    pub scan_id: String,
    pub scanned_path: PathBuf,
    pub scan_mode: ScanMode,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_files_scanned: u64,
    pub clean_files: u64,
    pub suspicious_files: u64,
    pub malware_files: u64,
    pub error_files: u64,
    pub total_bytes_scanned: u64,
}

impl ScanSummary {
    /// Start a new summary for a path and mode.
    pub fn new(scanned_path: impl Into<PathBuf>, scan_mode: ScanMode) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            scanned_path: scanned_path.into(),
            scan_mode,
            start_time: Utc::now(),
            end_time: None,
            total_files_scanned: 0,
            clean_files: 0,
            suspicious_files: 0,
            malware_files: 0,
            error_files: 0,
            total_bytes_scanned: 0,
        }
    }

    /// Tally one result. Errors take precedence over the threat level.
    pub fn record(&mut self, result: &ScanResult) {
        self.total_files_scanned += 1;
        self.total_bytes_scanned += result.file_size;

        if !result.is_successful() {
            self.error_files += 1;
            return;
        }

        match result.threat_level {
            ThreatLevel::Malware => self.malware_files += 1,
            ThreatLevel::Suspicious => self.suspicious_files += 1,
            ThreatLevel::Clean => self.clean_files += 1,
        }
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Elapsed time; runs to "now" while unfinished.
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    pub fn total_threats(&self) -> u64 {
        self.suspicious_files + self.malware_files
    }

    /// "2 min 5 s" for a minute or longer, otherwise "4.2 seconds".
    pub fn formatted_duration(&self) -> String {
        let millis = self.duration().num_milliseconds().max(0);
        let secs = millis / 1000;

        if secs >= 60 {
            format!("{} min {} s", secs / 60, secs % 60)
        } else {
            format!("{:.1} seconds", millis as f64 / 1000.0)
        }
    }

    pub fn formatted_size(&self) -> String {
        format_bytes(self.total_bytes_scanned)
    }
}

/// Render a byte count with a binary unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value >= GB {
        format!("{:.2} GB", value / GB)
    } else if value >= MB {
        format!("{:.2} MB", value / MB)
    } else if value >= KB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{} bytes", bytes)
    }
}
