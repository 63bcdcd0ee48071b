//! Persisted report document.

use crate::core::types::{ScanResult, ScanSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current report schema version.
pub const REPORT_VERSION: &str = "1.0";

/// Versioned envelope written once per completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub report_version: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub results: Vec<ReportEntry>,
}

impl ScanReport {
    /// Build a report from a finished summary and its results.
    pub fn new(summary: &ScanSummary, results: &[ScanResult]) -> Self {
        Self {
            report_version: REPORT_VERSION.to_string(),
            generated_at: Utc::now(),
            summary: ReportSummary::from(summary),
            results: results.iter().map(ReportEntry::from).collect(),
        }
    }

    /// Entries flagged Suspicious or Malware.
    pub fn threats(&self) -> impl Iterator<Item = &ReportEntry> {
        self.results.iter().filter(|e| e.result.is_threat())
    }
}

/// Summary fields plus display-ready extras.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(flatten)]
    pub summary: ScanSummary,
    pub formatted_duration: String,
    pub formatted_size: String,
    pub total_threats: u64,
}

impl From<&ScanSummary> for ReportSummary {
    fn from(summary: &ScanSummary) -> Self {
        Self {
            formatted_duration: summary.formatted_duration(),
            formatted_size: summary.formatted_size(),
            total_threats: summary.total_threats(),
            summary: summary.clone(),
        }
    }
}

/// Per-file detail, including nested findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub file_name: String,
    pub is_successful: bool,
    #[serde(flatten)]
    pub result: ScanResult,
}

impl From<&ScanResult> for ReportEntry {
    fn from(result: &ScanResult) -> Self {
        Self {
            file_name: result.file_name(),
            is_successful: result.is_successful(),
            result: result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{HeuristicFinding, HeuristicFindingType, ScanMode, ThreatLevel};

    fn sample() -> (ScanSummary, Vec<ScanResult>) {
        let mut summary = ScanSummary::new("/data", ScanMode::Full);

        let clean = ScanResult::new("/data/notes.txt");
        let mut suspicious = ScanResult::new("/data/invoice.pdf.exe");
        suspicious.threat_level = ThreatLevel::Suspicious;
        suspicious.risk_score = 50;
        suspicious.findings.push(HeuristicFinding::new(
            HeuristicFindingType::DoubleExtension,
            "Double extension detected: .pdf.exe",
            35,
        ));
        let failed = ScanResult::failed("/data/locked.bin", "Access denied");

        let results = vec![clean, suspicious, failed];
        for r in &results {
            summary.record(r);
        }
        summary.finish();
        (summary, results)
    }

    #[test]
    fn test_report_json_shape() {
        let (summary, results) = sample();
        let report = ScanReport::new(&summary, &results);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["reportVersion"], "1.0");
        assert!(value["generatedAt"].is_string());
        assert_eq!(value["summary"]["totalFilesScanned"], 3);
        assert_eq!(value["summary"]["errorFiles"], 1);
        assert_eq!(value["summary"]["totalThreats"], 1);
        assert!(value["summary"]["formattedDuration"].is_string());
        assert_eq!(value["summary"]["scanMode"], "full");

        let entry = &value["results"][1];
        assert_eq!(entry["fileName"], "invoice.pdf.exe");
        assert_eq!(entry["isSuccessful"], true);
        assert_eq!(entry["threatLevel"], "suspicious");
        assert_eq!(entry["findings"][0]["type"], "double_extension");
        assert_eq!(entry["findings"][0]["riskContribution"], 35);
        assert_eq!(value["results"][2]["errorMessage"], "Access denied");
    }

    #[test]
    fn test_report_parse_back() {
        let (summary, results) = sample();
        let json = serde_json::to_string_pretty(&ScanReport::new(&summary, &results)).unwrap();
        let parsed: ScanReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.summary.summary.scan_id, summary.scan_id);
        assert_eq!(parsed.results.len(), 3);
        assert_eq!(parsed.results[1].result, results[1]);
        assert_eq!(parsed.threats().count(), 1);
    }
}
