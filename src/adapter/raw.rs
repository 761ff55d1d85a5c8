//! Raw findings as each adapter family emits them, before normalization.
//! Secret values in `RawSecretFinding` are still plaintext here; they never
//! leave the process un-redacted because normalization is the only path into
//! a session.

use crate::types::Severity;

#[derive(Debug, Clone)]
pub enum RawFinding {
    Static(RawStaticFinding),
    Secret(RawSecretFinding),
    CloudConfig(RawCloudFinding),
    Advisory(RawAdvisoryFinding),
}

/// Static-analysis hit: subprocess scanner result or in-process pattern match.
#[derive(Debug, Clone, Default)]
pub struct RawStaticFinding {
    pub rule_id: String,
    /// Tool-native severity label ("ERROR", "WARNING", "INFO", ...).
    pub severity: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub category: Option<String>,
    pub cwe: Option<String>,
    pub owasp: Option<String>,
    /// Free-form metadata text the normalizer mines for CWE/OWASP references.
    pub metadata: Option<String>,
    pub base_confidence: Option<f64>,
    pub recommendation: Option<String>,
}

/// Detected secret, from the subprocess detector or the in-process matcher.
#[derive(Debug, Clone, Default)]
pub struct RawSecretFinding {
    /// Detector identifier, e.g. "aws-access-key" or "AWS".
    pub detector: String,
    /// Plaintext matched value. Redacted during normalization.
    pub value: String,
    /// Live-verification result, when the detector attempted one.
    pub verified: Option<bool>,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Severity the detector itself assigns. Absent for verification-style
    /// detectors, whose severity derives from the verified flag.
    pub severity_hint: Option<Severity>,
    pub base_confidence: Option<f64>,
    pub entropy: Option<f64>,
    pub recommendation: Option<String>,
}

/// Cloud configuration check result. Severity is fixed per check.
#[derive(Debug, Clone)]
pub struct RawCloudFinding {
    pub check: &'static str,
    pub severity: Severity,
    pub category: &'static str,
    pub resource: String,
    pub message: String,
    pub recommendation: &'static str,
}

/// Known-vulnerability advisory matched against the session.
#[derive(Debug, Clone, Default)]
pub struct RawAdvisoryFinding {
    pub id: String,
    pub summary: String,
    /// Advisory severity label ("critical", "high", ...).
    pub severity: String,
    pub package: Option<String>,
    pub url: Option<String>,
}
