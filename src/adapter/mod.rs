//! Tool adapters: thin wrappers over external scanners and in-process
//! matchers. Each adapter produces raw, tool-shaped findings; the normalizer
//! turns those into the shared `Finding` shape.

pub mod advisory;
pub mod cloud;
pub mod pattern;
pub mod raw;
pub mod secret_detection;
pub mod static_analysis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ScanUnit;
use raw::RawFinding;

/// Failure modes shared by all tool adapters.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Tool binary missing, service unreachable, or not configured.
    #[error("{tool} unavailable: {message}")]
    Unavailable { tool: String, message: String },

    /// Tool exceeded its time budget.
    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    /// Tool output could not be parsed.
    #[error("failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },
}

impl AdapterError {
    pub fn unavailable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            seconds: timeout.as_secs(),
        }
    }

    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Ruleset depth for static analysis: snippets get the fast profile, full
/// repositories the thorough one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesetProfile {
    Fast,
    Full,
}

impl RulesetProfile {
    pub fn rulesets(&self, language: Option<&str>) -> Vec<String> {
        let mut sets = vec!["p/owasp-top-ten".to_string()];
        if let RulesetProfile::Full = self {
            sets.push("p/cwe-top-25".to_string());
            sets.push("p/security-audit".to_string());
        }
        if let Some(lang) = language {
            sets.push(format!("p/{}", lang));
        }
        sets
    }
}

/// What an adapter is asked to scan.
#[derive(Debug, Clone)]
pub enum ScanInput {
    Unit(ScanUnit),
    Snippet { content: String, language: String },
    Bucket { name: String },
}

impl ScanInput {
    /// Text content, when the input carries any.
    pub fn content(&self) -> Option<&str> {
        match self {
            ScanInput::Unit(unit) => unit.content.as_deref(),
            ScanInput::Snippet { content, .. } => Some(content),
            ScanInput::Bucket { .. } => None,
        }
    }

    /// Path label used in finding locations.
    pub fn label(&self) -> &str {
        match self {
            ScanInput::Unit(unit) => &unit.path,
            ScanInput::Snippet { .. } => "snippet",
            ScanInput::Bucket { name } => name,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            ScanInput::Unit(unit) => {
                let ext = unit.extension()?;
                crate::discovery::patterns::language_for_extension(&ext)
            }
            ScanInput::Snippet { language, .. } => Some(language),
            ScanInput::Bucket { .. } => None,
        }
    }
}

/// Per-call options, set by the orchestrator per phase and target kind.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub profile: RulesetProfile,
    pub timeout: Duration,
    pub verify_secrets: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            profile: RulesetProfile::Fast,
            timeout: Duration::from_secs(crate::config::DEFAULT_SNIPPET_TIMEOUT_SECS),
            verify_secrets: false,
        }
    }
}

/// A security tool behind a uniform async interface. One adapter failing is a
/// phase outcome, never a session abort.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        input: &ScanInput,
        options: &RunOptions,
    ) -> Result<Vec<RawFinding>, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruleset_profiles() {
        let fast = RulesetProfile::Fast.rulesets(Some("python"));
        assert_eq!(fast, vec!["p/owasp-top-ten", "p/python"]);

        let full = RulesetProfile::Full.rulesets(None);
        assert_eq!(full, vec!["p/owasp-top-ten", "p/cwe-top-25", "p/security-audit"]);
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::timeout("semgrep", Duration::from_secs(30));
        assert_eq!(err.to_string(), "semgrep timed out after 30s");
    }

    #[test]
    fn test_scan_input_content() {
        let input = ScanInput::Snippet {
            content: "let x = 1;".to_string(),
            language: "javascript".to_string(),
        };
        assert_eq!(input.content(), Some("let x = 1;"));
        assert_eq!(input.label(), "snippet");
    }
}
