//! Risk aggregation over a normalized finding set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Finding, Severity};

/// Categories always present in an assessment, even with no findings.
pub const CORE_CATEGORIES: &[&str] = &["access-control", "encryption", "secrets", "logging"];

/// High-count threshold above which the overall level escalates to High.
const HIGH_COUNT_THRESHOLD: usize = 2;
/// Total-count threshold above which the overall level escalates to Medium.
const TOTAL_COUNT_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall risk plus one level per category. Deterministic for a given
/// finding set; category keys are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall: RiskLevel,
    pub categories: BTreeMap<String, RiskLevel>,
}

impl RiskAssessment {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut categories = BTreeMap::new();
        for category in CORE_CATEGORIES {
            categories.insert(category.to_string(), RiskLevel::Low);
        }
        for finding in findings {
            categories
                .entry(finding.category.clone())
                .or_insert(RiskLevel::Low);
        }
        for (category, level) in categories.iter_mut() {
            let in_category: Vec<&Finding> = findings
                .iter()
                .filter(|f| &f.category == category)
                .collect();
            *level = category_level(&in_category);
        }

        Self {
            overall: overall_level(findings),
            categories,
        }
    }
}

/// Any critical wins; more than two highs escalate; more than three findings
/// in total still warrant attention.
fn overall_level(findings: &[Finding]) -> RiskLevel {
    let critical = findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count();
    let high = findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count();
    if critical > 0 {
        RiskLevel::Critical
    } else if high > HIGH_COUNT_THRESHOLD {
        RiskLevel::High
    } else if findings.len() > TOTAL_COUNT_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn category_level(findings: &[&Finding]) -> RiskLevel {
    if findings.iter().any(|f| f.severity == Severity::Critical) {
        RiskLevel::Critical
    } else if findings.iter().any(|f| f.severity == Severity::High) {
        RiskLevel::High
    } else if findings.len() > 1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
