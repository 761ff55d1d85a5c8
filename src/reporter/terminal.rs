use colored::Colorize;

use crate::compliance::ComplianceStatus;
use crate::reporter::Reporter;
use crate::risk::RiskLevel;
use crate::types::{Finding, ScanReport, Severity};

/// Findings printed in full; the rest are summarized.
const MAX_PRINTED_FINDINGS: usize = 20;

pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn severity_label(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{}]", severity);
        match severity {
            Severity::Critical => label.red().bold(),
            Severity::High => label.yellow().bold(),
            Severity::Medium => label.cyan(),
            Severity::Low | Severity::Info => label.white(),
        }
    }

    fn risk_label(&self, level: RiskLevel) -> colored::ColoredString {
        let label = level.as_str();
        match level {
            RiskLevel::Low => label.green().bold(),
            RiskLevel::Medium => label.cyan().bold(),
            RiskLevel::High => label.yellow().bold(),
            RiskLevel::Critical => label.red().bold(),
        }
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let mut output = String::new();
        let location = finding
            .location
            .as_ref()
            .map(|l| match l.line {
                Some(line) => format!("{}:{}", l.file, line),
                None => l.file.clone(),
            })
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "  {} {} {} ({})\n",
            self.severity_label(finding.severity),
            finding.kind.bold(),
            location.dimmed(),
            finding.source
        ));
        output.push_str(&format!("      {}\n", finding.message));
        if self.verbose {
            output.push_str(&format!(
                "      fix: {}\n",
                finding.recommendation.dimmed()
            ));
            if let Some(cwe) = &finding.cwe {
                output.push_str(&format!("      {}\n", cwe.dimmed()));
            }
        }
        output
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, report: &ScanReport) -> String {
        let mut output = String::new();
        let session = &report.session;

        output.push_str(&format!(
            "\n{} {}\n",
            "Scan report for".bold(),
            session.target.to_string().bold()
        ));
        output.push_str(&format!("Session: {}\n\n", session.id.to_string().dimmed()));

        for (phase, outcome) in [
            ("discovery", &session.phases.discovery),
            ("static analysis", &session.phases.static_analysis),
            ("secret detection", &session.phases.secret_detection),
            ("dependency & compliance", &session.phases.dependency_and_compliance),
            ("ai enrichment", &session.phases.ai_enrichment),
        ] {
            let status = if outcome.completed {
                "ok".green()
            } else {
                "failed".red()
            };
            match &outcome.error {
                Some(error) => output.push_str(&format!("  {:<24} {} ({})\n", phase, status, error)),
                None => output.push_str(&format!("  {:<24} {}\n", phase, status)),
            }
        }

        let summary = &session.summary;
        output.push_str(&format!(
            "\n{}: {} critical, {} high, {} medium, {} low, {} info\n",
            "Findings".bold(),
            summary.critical.to_string().red(),
            summary.high.to_string().yellow(),
            summary.medium.to_string().cyan(),
            summary.low,
            summary.info,
        ));
        output.push_str(&format!(
            "{}: {}\n",
            "Overall risk".bold(),
            self.risk_label(report.risk_assessment.overall)
        ));

        let compliance = &report.compliance_report.overall;
        let status = match compliance.status {
            ComplianceStatus::Compliant => "compliant".green(),
            ComplianceStatus::Partial => "partial".yellow(),
            ComplianceStatus::NonCompliant => "non-compliant".red(),
        };
        output.push_str(&format!(
            "{}: {} ({}/100, {})\n",
            "Compliance".bold(),
            compliance.grade.bold(),
            compliance.score,
            status
        ));

        if !report.findings.is_empty() {
            output.push('\n');
            let mut sorted: Vec<&Finding> = report.findings.iter().collect();
            sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
            for finding in sorted.iter().take(MAX_PRINTED_FINDINGS) {
                output.push_str(&self.format_finding(finding));
            }
            if sorted.len() > MAX_PRINTED_FINDINGS {
                output.push_str(&format!(
                    "  ... and {} more (use --format json for the full list)\n",
                    sorted.len() - MAX_PRINTED_FINDINGS
                ));
            }
        }

        output.push_str(&format!(
            "\n{} units scanned, {} skipped, {} ms\n",
            session.metrics.units_scanned,
            session.metrics.units_skipped,
            session.metrics.duration_ms
        ));
        output
    }
}
