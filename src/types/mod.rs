//! Core data model shared across the scan pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a scan session runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanTarget {
    Repository { owner: String, name: String },
    Bucket { name: String },
    Snippet { language: String },
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanTarget::Repository { owner, name } => write!(f, "{}/{}", owner, name),
            ScanTarget::Bucket { name } => write!(f, "s3://{}", name),
            ScanTarget::Snippet { language } => write!(f, "snippet ({})", language),
        }
    }
}

/// Where in a scan unit a finding was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// A normalized security finding. Every adapter's raw output is converted
/// into this shape before aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub confidence: f64,
    pub message: String,
    pub recommendation: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owasp: Option<String>,
}

/// Severity counts plus the pass/fail verdict for a finding set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
    pub passed: bool,
}

impl Summary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Summary::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }
        summary.total = findings.len();
        summary.passed = summary.critical == 0 && summary.high == 0;
        summary
    }
}

/// The fixed pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Discovery,
    StaticAnalysis,
    SecretDetection,
    DependencyAndCompliance,
    AiEnrichment,
}

impl Phase {
    pub fn all() -> [Phase; 5] {
        [
            Phase::Discovery,
            Phase::StaticAnalysis,
            Phase::SecretDetection,
            Phase::DependencyAndCompliance,
            Phase::AiEnrichment,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::StaticAnalysis => "staticAnalysis",
            Phase::SecretDetection => "secretDetection",
            Phase::DependencyAndCompliance => "dependencyAndCompliance",
            Phase::AiEnrichment => "aiEnrichment",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single phase. A failed phase carries the error message but
/// never aborts the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseOutcome {
    pub fn ok() -> Self {
        Self {
            completed: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            completed: false,
            error: Some(error.into()),
        }
    }
}

/// Per-phase outcomes, serialized in pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseLog {
    pub discovery: PhaseOutcome,
    pub static_analysis: PhaseOutcome,
    pub secret_detection: PhaseOutcome,
    pub dependency_and_compliance: PhaseOutcome,
    pub ai_enrichment: PhaseOutcome,
}

impl PhaseLog {
    pub fn get(&self, phase: Phase) -> &PhaseOutcome {
        match phase {
            Phase::Discovery => &self.discovery,
            Phase::StaticAnalysis => &self.static_analysis,
            Phase::SecretDetection => &self.secret_detection,
            Phase::DependencyAndCompliance => &self.dependency_and_compliance,
            Phase::AiEnrichment => &self.ai_enrichment,
        }
    }

    pub fn set(&mut self, phase: Phase, outcome: PhaseOutcome) {
        match phase {
            Phase::Discovery => self.discovery = outcome,
            Phase::StaticAnalysis => self.static_analysis = outcome,
            Phase::SecretDetection => self.secret_detection = outcome,
            Phase::DependencyAndCompliance => self.dependency_and_compliance = outcome,
            Phase::AiEnrichment => self.ai_enrichment = outcome,
        }
    }
}

/// Counters collected while a session runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetrics {
    pub duration_ms: u64,
    pub units_scanned: usize,
    pub units_skipped: usize,
}

/// One end-to-end scan: target, phase outcomes, findings, counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    pub id: Uuid,
    pub target: ScanTarget,
    pub started_at: DateTime<Utc>,
    pub phases: PhaseLog,
    pub findings: Vec<Finding>,
    pub metrics: ScanMetrics,
    pub summary: Summary,
}

impl ScanSession {
    pub fn new(target: ScanTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            started_at: Utc::now(),
            phases: PhaseLog::default(),
            findings: Vec::new(),
            metrics: ScanMetrics::default(),
            summary: Summary::default(),
        }
    }
}

/// The full output document of a scan: the session plus the derived risk and
/// compliance views. This is what gets persisted and reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub session: ScanSession,
    pub findings: Vec<Finding>,
    pub risk_assessment: crate::risk::RiskAssessment,
    pub compliance_report: crate::compliance::ComplianceReport,
}

impl ScanReport {
    /// Derive the aggregate views from a finished session.
    pub fn from_session(session: ScanSession) -> Self {
        let risk_assessment = crate::risk::RiskAssessment::from_findings(&session.findings);
        let compliance_report =
            crate::compliance::ComplianceReport::from_findings(&session.findings);
        let findings = session.findings.clone();
        Self {
            session,
            findings,
            risk_assessment,
            compliance_report,
        }
    }
}

/// A scannable item produced by discovery. Content is only present when the
/// unit was small enough to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanUnit {
    pub path: String,
    pub size_bytes: u64,
    pub content: Option<String>,
    pub sensitive_name: bool,
    pub dependency_manifest: bool,
}

impl ScanUnit {
    pub fn new(path: impl Into<String>, size_bytes: u64) -> Self {
        let path = path.into();
        let sensitive_name = crate::discovery::patterns::is_sensitive_name(&path);
        let dependency_manifest = crate::discovery::patterns::is_dependency_manifest(&path);
        Self {
            path,
            size_bytes,
            content: None,
            sensitive_name,
            dependency_manifest,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// File extension, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}
