//! Digest lookup against the signature database.

use super::database::SignatureDatabase;
use super::signature::Signature;
use crate::core::types::Severity;
use std::sync::Arc;

/// Result of a signature lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// The matched signature
    pub signature: Option<Signature>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.signature.is_some()
    }

    /// Matched threat name, empty when nothing matched.
    pub fn threat_name(&self) -> &str {
        self.signature.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn severity(&self) -> Option<Severity> {
        self.signature.as_ref().map(|s| s.severity)
    }
}

/// Stateless matcher over a shared signature database.
#[derive(Debug, Clone)]
pub struct SignatureMatcher {
    db: Arc<SignatureDatabase>,
}

impl SignatureMatcher {
    pub fn new(db: Arc<SignatureDatabase>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<SignatureDatabase> {
        &self.db
    }

    /// Match a digest. Blank input never matches.
    pub fn match_digest(&self, digest: &str) -> MatchResult {
        if digest.trim().is_empty() {
            return MatchResult::no_match();
        }

        match self.db.find_by_digest(digest) {
            Some(signature) => {
                log::debug!("Signature match: {} ({})", signature.name, signature.sha256);
                MatchResult {
                    signature: Some(signature),
                }
            }
            None => MatchResult::no_match(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> SignatureMatcher {
        let db = SignatureDatabase::from_signatures(vec![Signature::new(
            "Worm.Sample",
            "deadbeef",
            Severity::Malware,
        )]);
        SignatureMatcher::new(Arc::new(db))
    }

    #[test]
    fn test_match() {
        let result = matcher().match_digest("DEADBEEF");
        assert!(result.is_match());
        assert_eq!(result.threat_name(), "Worm.Sample");
        assert_eq!(result.severity(), Some(Severity::Malware));
    }

    #[test]
    fn test_no_match() {
        let m = matcher();
        assert!(!m.match_digest("cafebabe").is_match());
        assert!(!m.match_digest("").is_match());
        assert!(!m.match_digest("   ").is_match());
        assert_eq!(m.match_digest("").threat_name(), "");
    }
}
