use crate::reporter::Reporter;
use crate::types::ScanReport;

pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JsonReporter {
    fn report(&self, report: &ScanReport) -> String {
        serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize report: {}"}}"#, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanSession, ScanTarget};

    #[test]
    fn test_json_output_structure() {
        let session = ScanSession::new(ScanTarget::Snippet {
            language: "python".to_string(),
        });
        let report = ScanReport::from_session(session);
        let output = JsonReporter::new().report(&report);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["session"]["target"]["kind"], "snippet");
        assert_eq!(parsed["riskAssessment"]["overall"], "low");
        assert_eq!(parsed["complianceReport"]["overall"]["grade"], "A+");
        assert!(parsed["findings"].as_array().unwrap().is_empty());
    }
}
