//! Signature records and the on-disk signature list format.

use crate::core::types::Severity;
use serde::{Deserialize, Serialize};

/// A known-bad content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Human-readable threat name (e.g., "Trojan.GenericKD")
    #[serde(alias = "Name", alias = "threatName")]
    pub name: String,
    /// SHA256 of the file content, hex encoded
    #[serde(alias = "digest", alias = "Sha256", alias = "hash")]
    pub sha256: String,
    /// Threat severity
    #[serde(default, alias = "Severity")]
    pub severity: Severity,
}

impl Signature {
    /// Create a new signature; the digest is normalized to lowercase.
    pub fn new(name: impl Into<String>, sha256: impl AsRef<str>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            sha256: normalize_digest(sha256.as_ref()),
            severity,
        }
    }

    /// Check if this signature matches a SHA256 hash.
    pub fn matches_sha256(&self, hash: &str) -> bool {
        self.sha256.eq_ignore_ascii_case(hash.trim())
    }
}

/// Canonical map key for a digest.
pub fn normalize_digest(digest: &str) -> String {
    digest.trim().to_ascii_lowercase()
}

/// Accepted signature source layouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignatureSource {
    /// `{ "version": "...", "signatures": [...] }`
    Envelope(SignatureFile),
    /// A bare list of records
    List(Vec<Signature>),
}

impl SignatureSource {
    pub fn into_signatures(self) -> Vec<Signature> {
        match self {
            SignatureSource::Envelope(file) => file.signatures,
            SignatureSource::List(list) => list,
        }
    }
}

/// Signature file with version information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureFile {
    /// Signature list version
    #[serde(default)]
    pub version: String,
    /// Signatures in this file
    pub signatures: Vec<Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matching_is_case_insensitive() {
        let sig = Signature::new("Test.Malware", "ABCDEF0123", Severity::Malware);
        assert_eq!(sig.sha256, "abcdef0123");
        assert!(sig.matches_sha256("abcdef0123"));
        assert!(sig.matches_sha256("ABCDEF0123"));
        assert!(!sig.matches_sha256("abcdef0124"));
    }

    #[test]
    fn test_parse_bare_list() {
        let json = r#"[
            { "name": "Eicar.Test", "sha256": "AA11", "severity": "Malware" },
            { "name": "Toolbar.Bundle", "digest": "bb22", "severity": "PUP" }
        ]"#;

        let source: SignatureSource = serde_json::from_str(json).unwrap();
        let sigs = source.into_signatures();
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].severity, Severity::Malware);
        assert_eq!(sigs[1].sha256, "bb22");
        assert_eq!(sigs[1].severity, Severity::Pup);
    }

    #[test]
    fn test_parse_envelope() {
        let json = r#"{
            "version": "2024.01",
            "signatures": [ { "name": "Adware.X", "sha256": "cc33" } ]
        }"#;

        let source: SignatureSource = serde_json::from_str(json).unwrap();
        let sigs = source.into_signatures();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].severity, Severity::Unknown);
    }
}
