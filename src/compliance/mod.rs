//! Compliance scoring: maps normalized findings onto OWASP Top 10, NIST CSF,
//! and ISO 27001 control tables and derives per-framework and blended scores.
//!
//! OWASP and ISO scores are deduction-based (weighted by severity), NIST is
//! coverage-based (share of controls without issues). All three are monotonic:
//! adding findings never raises a score.

pub mod frameworks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Finding, Severity};
use frameworks::{ControlTable, ISO27001_CONTROLS, NIST_CONTROLS, OWASP_TOP_10};

/// Violations listed per framework in the report; totals are kept in full.
const MAX_LISTED_VIOLATIONS: usize = 10;

/// Blend weights for the overall score.
const OWASP_WEIGHT: f64 = 0.4;
const NIST_WEIGHT: f64 = 0.3;
const ISO_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    Compliant,
    Partial,
    NonCompliant,
}

/// One finding-to-control match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub control: String,
    pub description: String,
    pub finding: String,
    pub severity: Severity,
}

/// Per-control match counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCoverage {
    pub description: String,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkScore {
    pub score: u32,
    pub violations: Vec<Violation>,
    pub total_violations: usize,
    pub controls_affected: usize,
    pub coverage: BTreeMap<String, ControlCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallCompliance {
    pub score: u32,
    pub grade: String,
    pub status: ComplianceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frameworks {
    pub owasp: FrameworkScore,
    pub nist: FrameworkScore,
    pub iso27001: FrameworkScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub overall: OverallCompliance,
    pub frameworks: Frameworks,
}

impl ComplianceReport {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let owasp = score_owasp(findings);
        let nist = score_nist(findings);
        let iso27001 = score_iso27001(findings);

        let blended = (owasp.score as f64 * OWASP_WEIGHT
            + nist.score as f64 * NIST_WEIGHT
            + iso27001.score as f64 * ISO_WEIGHT)
            .round() as u32;

        Self {
            overall: OverallCompliance {
                score: blended,
                grade: grade(blended).to_string(),
                status: status(blended),
            },
            frameworks: Frameworks {
                owasp,
                nist,
                iso27001,
            },
        }
    }
}

/// Letter grade for a 0-100 score.
pub fn grade(score: u32) -> &'static str {
    match score {
        95..=100 => "A+",
        90..=94 => "A",
        85..=89 => "A-",
        80..=84 => "B+",
        75..=79 => "B",
        70..=74 => "B-",
        65..=69 => "C+",
        60..=64 => "C",
        55..=59 => "C-",
        50..=54 => "D",
        _ => "F",
    }
}

fn status(score: u32) -> ComplianceStatus {
    if score >= 80 {
        ComplianceStatus::Compliant
    } else if score >= 60 {
        ComplianceStatus::Partial
    } else {
        ComplianceStatus::NonCompliant
    }
}

/// OWASP deduction weights.
fn owasp_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 7.0,
        Severity::Medium => 4.0,
        Severity::Low => 2.0,
        Severity::Info => 1.0,
    }
}

/// ISO 27001 deduction weights.
fn iso_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 8.0,
        Severity::High => 5.0,
        Severity::Medium => 3.0,
        Severity::Low => 1.0,
        Severity::Info => 0.5,
    }
}

pub fn score_owasp(findings: &[Finding]) -> FrameworkScore {
    let (violations, coverage) = match_controls(findings, OWASP_TOP_10);
    let deductions: f64 = violations.iter().map(|v| owasp_weight(v.severity)).sum();
    build_score(deduction_score(deductions), violations, coverage)
}

pub fn score_nist(findings: &[Finding]) -> FrameworkScore {
    let (violations, coverage) = match_controls(findings, NIST_CONTROLS);
    let total = NIST_CONTROLS.len();
    let with_issues = coverage.values().filter(|c| c.matches > 0).count();
    let score = (((total - with_issues) as f64 / total as f64) * 100.0).round() as u32;
    build_score(score, violations, coverage)
}

pub fn score_iso27001(findings: &[Finding]) -> FrameworkScore {
    let (violations, coverage) = match_controls(findings, ISO27001_CONTROLS);
    let deductions: f64 = violations.iter().map(|v| iso_weight(v.severity)).sum();
    build_score(deduction_score(deductions), violations, coverage)
}

fn deduction_score(deductions: f64) -> u32 {
    (100.0 - deductions).clamp(0.0, 100.0).round() as u32
}

fn build_score(
    score: u32,
    violations: Vec<Violation>,
    coverage: BTreeMap<String, ControlCoverage>,
) -> FrameworkScore {
    let total_violations = violations.len();
    let controls_affected = coverage.values().filter(|c| c.matches > 0).count();
    let mut listed = violations;
    listed.truncate(MAX_LISTED_VIOLATIONS);
    FrameworkScore {
        score,
        violations: listed,
        total_violations,
        controls_affected,
        coverage,
    }
}

/// Match every finding against every control keyword. A finding can hit
/// multiple controls and multiple keywords within one control; each hit is a
/// separate violation, mirroring the deduction model.
fn match_controls(
    findings: &[Finding],
    table: ControlTable,
) -> (Vec<Violation>, BTreeMap<String, ControlCoverage>) {
    let mut coverage: BTreeMap<String, ControlCoverage> = table
        .iter()
        .map(|(control, description, _)| {
            (
                control.to_string(),
                ControlCoverage {
                    description: description.to_string(),
                    matches: 0,
                },
            )
        })
        .collect();

    let mut violations = Vec::new();
    for finding in findings {
        let text = format!("{} {}", finding.kind, finding.message).to_ascii_lowercase();
        for (control, description, keywords) in table {
            for keyword in *keywords {
                if text.contains(keyword) {
                    if let Some(entry) = coverage.get_mut(*control) {
                        entry.matches += 1;
                    }
                    violations.push(Violation {
                        control: control.to_string(),
                        description: description.to_string(),
                        finding: finding.message.clone(),
                        severity: finding.severity,
                    });
                }
            }
        }
    }
    (violations, coverage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_finding(kind: &str, severity: Severity, message: &str) -> Finding {
        Finding {
            kind: kind.to_string(),
            severity,
            category: "secrets".to_string(),
            location: None,
            confidence: 0.9,
            message: message.to_string(),
            recommendation: "r".to_string(),
            source: "test".to_string(),
            verified: None,
            cwe: None,
            owasp: None,
        }
    }

    #[test]
    fn test_empty_findings_score_perfect() {
        let report = ComplianceReport::from_findings(&[]);
        assert_eq!(report.overall.score, 100);
        assert_eq!(report.overall.grade, "A+");
        assert_eq!(report.overall.status, ComplianceStatus::Compliant);
        assert_eq!(report.frameworks.owasp.score, 100);
        assert_eq!(report.frameworks.nist.score, 100);
        assert_eq!(report.frameworks.iso27001.score, 100);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade(100), "A+");
        assert_eq!(grade(95), "A+");
        assert_eq!(grade(94), "A");
        assert_eq!(grade(85), "A-");
        assert_eq!(grade(80), "B+");
        assert_eq!(grade(60), "C");
        assert_eq!(grade(50), "D");
        assert_eq!(grade(49), "F");
        assert_eq!(grade(0), "F");
    }

    #[test]
    fn test_secret_finding_maps_to_owasp_a07() {
        let findings = vec![make_finding(
            "aws-access-key",
            Severity::Critical,
            "Detected aws-access-key secret: AKIA********MPLE",
        )];
        let score = score_owasp(&findings);
        assert!(score.score < 100);
        assert!(score.violations.iter().any(|v| v.control == "A07:2021"));
    }

    #[test]
    fn test_nist_is_coverage_based() {
        // one control affected out of 19
        let findings = vec![make_finding(
            "public-read-access",
            Severity::Critical,
            "Bucket grants public read access via ACL",
        )];
        let score = score_nist(&findings);
        assert!(score.controls_affected >= 1);
        let expected = (((19 - score.controls_affected) as f64 / 19.0) * 100.0).round() as u32;
        assert_eq!(score.score, expected);
    }

    #[test]
    fn test_scores_are_monotonic_non_increasing() {
        let mut findings = Vec::new();
        let mut last = ComplianceReport::from_findings(&findings);
        for i in 0..8 {
            findings.push(make_finding(
                "hardcoded-password",
                Severity::High,
                &format!("Hardcoded password number {}", i),
            ));
            let next = ComplianceReport::from_findings(&findings);
            assert!(next.overall.score <= last.overall.score);
            assert!(next.frameworks.owasp.score <= last.frameworks.owasp.score);
            assert!(next.frameworks.nist.score <= last.frameworks.nist.score);
            assert!(next.frameworks.iso27001.score <= last.frameworks.iso27001.score);
            last = next;
        }
        assert_ne!(last.overall.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_violations_truncated_but_counted() {
        let findings: Vec<Finding> = (0..30)
            .map(|i| {
                make_finding(
                    "hardcoded-password",
                    Severity::Low,
                    &format!("password literal {}", i),
                )
            })
            .collect();
        let score = score_owasp(&findings);
        assert_eq!(score.violations.len(), MAX_LISTED_VIOLATIONS);
        assert!(score.total_violations >= 30);
    }

    #[test]
    fn test_deduction_floor_is_zero() {
        let findings: Vec<Finding> = (0..50)
            .map(|_| make_finding("sql-injection", Severity::Critical, "sql-injection found"))
            .collect();
        let score = score_owasp(&findings);
        assert_eq!(score.score, 0);
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = ComplianceReport::from_findings(&[make_finding(
            "encryption-disabled",
            Severity::High,
            "Bucket has no default encryption",
        )]);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["overall"]["score"].is_u64());
        assert!(value["frameworks"]["owasp"]["totalViolations"].is_u64());
        assert!(value["frameworks"]["nist"]["coverage"]["PR.DS"]["matches"].is_u64());
    }
}
