//! Framework control tables: each control with its human-readable name and
//! the keywords that map a finding onto it. Matching is substring search over
//! the lowercased finding type and message.

pub type ControlTable = &'static [(&'static str, &'static str, &'static [&'static str])];

/// OWASP Top 10 2021 categories.
pub const OWASP_TOP_10: ControlTable = &[
    (
        "A01:2021",
        "Broken Access Control",
        &["access-control", "authorization", "privilege-escalation", "idor", "path-traversal", "public-read", "public-write"],
    ),
    (
        "A02:2021",
        "Cryptographic Failures",
        &["weak-crypto", "insecure-hash", "no-encryption", "hardcoded-key", "weak-ssl", "weak hash", "encryption"],
    ),
    (
        "A03:2021",
        "Injection",
        &["sql-injection", "sql injection", "command-injection", "code-injection", "ldap-injection", "xpath-injection", "eval"],
    ),
    (
        "A04:2021",
        "Insecure Design",
        &["missing-rate-limit", "no-validation", "business-logic", "insecure-defaults"],
    ),
    (
        "A05:2021",
        "Security Misconfiguration",
        &["misconfiguration", "debug-enabled", "default-credentials", "verbose-errors", "public-access", "access-block"],
    ),
    (
        "A06:2021",
        "Vulnerable Components",
        &["outdated-dependency", "known-vulnerability", "vulnerable-dependency", "cve", "deprecated-function"],
    ),
    (
        "A07:2021",
        "Authentication Failures",
        &["weak-password", "session-fixation", "credential-stuffing", "no-mfa", "session-management", "secret", "password", "token", "credential"],
    ),
    (
        "A08:2021",
        "Software Integrity Failures",
        &["unsigned-code", "no-integrity-check", "insecure-deserialization", "deserialization", "supply-chain", "pickle"],
    ),
    (
        "A09:2021",
        "Logging Failures",
        &["insufficient-logging", "no-monitoring", "log-injection", "missing-audit", "logging-disabled", "access logging"],
    ),
    (
        "A10:2021",
        "SSRF",
        &["ssrf", "open-redirect", "url-redirect", "unvalidated-redirect"],
    ),
];

/// NIST Cybersecurity Framework functions and categories.
pub const NIST_CONTROLS: ControlTable = &[
    ("ID.AM", "Asset Management", &["asset-management", "inventory"]),
    ("ID.RA", "Risk Assessment", &["vulnerability-assessment", "risk-assessment", "threat-intelligence"]),
    ("PR.AC", "Access Control", &["access-control", "authentication", "authorization", "identity-management", "public-read", "public-write", "public-access"]),
    ("PR.AT", "Awareness & Training", &["security-awareness", "training"]),
    ("PR.DS", "Data Security", &["data-security", "encryption", "data-leak", "sensitive-data", "secret", "credential"]),
    ("PR.IP", "Information Protection", &["security-policy", "baseline", "configuration"]),
    ("PR.MA", "Maintenance", &["maintenance"]),
    ("PR.PT", "Protective Technology", &["protective-technology", "logging", "monitoring"]),
    ("DE.AE", "Anomalies & Events", &["anomaly-detection", "event-detection"]),
    ("DE.CM", "Continuous Monitoring", &["continuous-monitoring", "security-monitoring"]),
    ("DE.DP", "Detection Processes", &["detection-process"]),
    ("RS.RP", "Response Planning", &["response-planning"]),
    ("RS.CO", "Communications", &["communications"]),
    ("RS.AN", "Analysis", &["forensics"]),
    ("RS.MI", "Mitigation", &["mitigation"]),
    ("RS.IM", "Improvements", &["improvements"]),
    ("RC.RP", "Recovery Planning", &["recovery-planning"]),
    ("RC.IM", "Recovery Improvements", &["recovery-improvements"]),
    ("RC.CO", "Recovery Communications", &["recovery-communications"]),
];

/// ISO 27001:2013 Annex A control groups.
pub const ISO27001_CONTROLS: ControlTable = &[
    ("A.5", "Information Security Policies", &["security-policy", "information-security-policy"]),
    ("A.6", "Organization of Information Security", &["internal-organization"]),
    ("A.7", "Human Resource Security", &["human-resources", "employee-security"]),
    ("A.8", "Asset Management", &["asset-management", "information-classification"]),
    ("A.9", "Access Control", &["access-control", "authentication", "authorization", "user-access", "public-read", "public-write", "public-access"]),
    ("A.10", "Cryptography", &["cryptography", "encryption", "key-management", "weak hash"]),
    ("A.11", "Physical and Environmental Security", &["physical-security", "secure-areas"]),
    ("A.12", "Operations Security", &["operations-security", "change-management", "capacity-management", "malware-protection"]),
    ("A.13", "Communications Security", &["communications-security", "network-security", "information-transfer", "tls"]),
    ("A.14", "System Acquisition, Development", &["system-acquisition", "development", "security-requirements", "injection", "xss"]),
    ("A.15", "Supplier Relationships", &["supplier-relationships", "supply-chain", "vulnerable-dependency"]),
    ("A.16", "Information Security Incident Management", &["incident-management", "security-events", "evidence-collection"]),
    ("A.17", "Business Continuity Management", &["business-continuity", "redundancy", "versioning"]),
    ("A.18", "Compliance", &["legal-requirements", "privacy", "data-protection"]),
];
