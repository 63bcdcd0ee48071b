//! Heuristic result and score accounting.
//!
//! Scores are the plain sum of every triggered finding, capped at 100.
//! Buckets (informational):
//! - 0-19: None
//! - 20-39: Low
//! - 40-69: Medium
//! - 70-100: High

use crate::core::types::{HeuristicFinding, HeuristicFindingType, RiskLevel};

/// Highest possible risk score.
pub const MAX_RISK_SCORE: u8 = 100;

/// Score at which a heuristic result is considered suspicious on its own.
pub const SUSPICIOUS_SCORE: u8 = 70;

/// Outcome of heuristic analysis for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicResult {
    /// Clamped total of all finding contributions
    pub risk_score: u8,
    /// Findings in the order the checks ran
    pub findings: Vec<HeuristicFinding>,
}

impl HeuristicResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a triggered check and update the clamped score.
    pub fn add(&mut self, finding_type: HeuristicFindingType, description: String, score: u8) {
        self.findings
            .push(HeuristicFinding::new(finding_type, description, score));
        self.risk_score = Self::clamp_total(&self.findings);
    }

    fn clamp_total(findings: &[HeuristicFinding]) -> u8 {
        let total: u32 = findings.iter().map(|f| f.risk_contribution as u32).sum();
        total.min(MAX_RISK_SCORE as u32) as u8
    }

    pub fn has(&self, finding_type: HeuristicFindingType) -> bool {
        self.findings.iter().any(|f| f.finding_type == finding_type)
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    pub fn is_suspicious(&self) -> bool {
        self.risk_score >= SUSPICIOUS_SCORE
    }

    /// Finding descriptions joined with "; ".
    pub fn summary(&self) -> String {
        if self.findings.is_empty() {
            return "No suspicious findings".to_string();
        }

        self.findings
            .iter()
            .map(|f| f.description.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
