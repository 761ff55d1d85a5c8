//! Subprocess adapter for a semgrep-compatible static analysis scanner.
//!
//! Content is staged into a temp directory, the tool runs against it with a
//! ruleset profile, and the JSON report on stdout is mapped to raw findings.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::raw::{RawFinding, RawStaticFinding};
use super::{AdapterError, RunOptions, ScanInput, ToolAdapter};

pub struct StaticAnalysisAdapter {
    command: String,
}

#[derive(Debug, Deserialize)]
struct ToolReport {
    #[serde(default)]
    results: Vec<ToolResult>,
}

#[derive(Debug, Deserialize)]
struct ToolResult {
    check_id: String,
    #[serde(default)]
    start: ToolPosition,
    extra: ToolExtra,
}

#[derive(Debug, Default, Deserialize)]
struct ToolPosition {
    #[serde(default)]
    line: usize,
    #[serde(default)]
    col: usize,
}

#[derive(Debug, Deserialize)]
struct ToolExtra {
    message: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl StaticAnalysisAdapter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn stage_name(input: &ScanInput) -> String {
        match input {
            ScanInput::Unit(unit) => unit
                .path
                .rsplit('/')
                .next()
                .unwrap_or("unit.txt")
                .to_string(),
            ScanInput::Snippet { language, .. } => {
                format!("snippet.{}", extension_for_language(language))
            }
            ScanInput::Bucket { name } => format!("{}.txt", name),
        }
    }

    fn parse_report(&self, stdout: &[u8], original_label: &str) -> Result<Vec<RawFinding>, AdapterError> {
        let report: ToolReport = serde_json::from_slice(stdout)
            .map_err(|e| AdapterError::parse(self.name(), e.to_string()))?;
        Ok(report
            .results
            .into_iter()
            .map(|r| {
                let metadata_text = if r.extra.metadata.is_null() {
                    None
                } else {
                    Some(r.extra.metadata.to_string())
                };
                RawFinding::Static(RawStaticFinding {
                    rule_id: r.check_id,
                    severity: r.extra.severity,
                    message: r.extra.message,
                    file: Some(original_label.to_string()),
                    line: (r.start.line > 0).then_some(r.start.line),
                    column: (r.start.col > 0).then_some(r.start.col),
                    category: None,
                    cwe: None,
                    owasp: None,
                    metadata: metadata_text,
                    base_confidence: None,
                    recommendation: None,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ToolAdapter for StaticAnalysisAdapter {
    fn name(&self) -> &'static str {
        "static-analysis"
    }

    async fn run(
        &self,
        input: &ScanInput,
        options: &RunOptions,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        let Some(content) = input.content() else {
            return Ok(Vec::new());
        };

        let staging = tempfile::tempdir()
            .map_err(|e| AdapterError::unavailable(self.name(), e.to_string()))?;
        let file_path = staging.path().join(Self::stage_name(input));
        let mut file = tokio::fs::File::create(&file_path)
            .await
            .map_err(|e| AdapterError::unavailable(self.name(), e.to_string()))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| AdapterError::unavailable(self.name(), e.to_string()))?;
        drop(file);

        let mut command = tokio::process::Command::new(&self.command);
        command
            .arg("--json")
            .arg("--quiet")
            .arg(format!("--timeout={}", options.timeout.as_secs()));
        for ruleset in options.profile.rulesets(input.language()) {
            command.arg(format!("--config={}", ruleset));
        }
        command
            .arg(&file_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            // a timed-out tool must not outlive the scan
            .kill_on_drop(true);

        debug!(tool = self.name(), label = input.label(), "running static analysis");

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AdapterError::unavailable(self.name(), format!("'{}' not found", self.command))
            } else {
                AdapterError::unavailable(self.name(), e.to_string())
            }
        })?;

        let output = tokio::time::timeout(options.timeout, child.wait_with_output())
            .await
            .map_err(|_| AdapterError::timeout(self.name(), options.timeout))?
            .map_err(|e| AdapterError::unavailable(self.name(), e.to_string()))?;

        // exit code 1 means findings were reported, not a tool failure
        match output.status.code() {
            Some(0) | Some(1) => self.parse_report(&output.stdout, input.label()),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(AdapterError::unavailable(
                    self.name(),
                    format!(
                        "exit {:?}: {}",
                        code,
                        stderr.lines().next().unwrap_or("no output")
                    ),
                ))
            }
        }
    }
}

pub(crate) fn extension_for_language(language: &str) -> &'static str {
    match language {
        "javascript" => "js",
        "typescript" => "ts",
        "python" => "py",
        "ruby" => "rb",
        "go" => "go",
        "java" => "java",
        "php" => "php",
        "c" => "c",
        "csharp" => "cs",
        "rust" => "rs",
        "kotlin" => "kt",
        "bash" => "sh",
        "yaml" => "yml",
        "json" => "json",
        "terraform" => "tf",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanUnit;

    #[test]
    fn test_parse_report() {
        let adapter = StaticAnalysisAdapter::new("semgrep");
        let stdout = br#"{
            "results": [{
                "check_id": "javascript.lang.security.audit.sqli",
                "path": "/tmp/x/app.js",
                "start": {"line": 14, "col": 3},
                "extra": {
                    "message": "Possible SQL injection",
                    "severity": "ERROR",
                    "metadata": {"cwe": ["CWE-89: SQL Injection"], "owasp": ["A03:2021 - Injection"]}
                }
            }]
        }"#;
        let findings = adapter.parse_report(stdout, "src/app.js").unwrap();
        assert_eq!(findings.len(), 1);
        let RawFinding::Static(f) = &findings[0] else {
            panic!("expected static finding");
        };
        assert_eq!(f.rule_id, "javascript.lang.security.audit.sqli");
        assert_eq!(f.severity, "ERROR");
        assert_eq!(f.file.as_deref(), Some("src/app.js"));
        assert_eq!(f.line, Some(14));
        assert!(f.metadata.as_deref().unwrap().contains("CWE-89"));
    }

    #[test]
    fn test_parse_report_rejects_garbage() {
        let adapter = StaticAnalysisAdapter::new("semgrep");
        let err = adapter.parse_report(b"not json", "a.js").unwrap_err();
        assert!(matches!(err, AdapterError::Parse { .. }));
    }

    #[test]
    fn test_stage_name() {
        let unit = ScanInput::Unit(ScanUnit::new("src/lib/auth.py", 10));
        assert_eq!(StaticAnalysisAdapter::stage_name(&unit), "auth.py");

        let snippet = ScanInput::Snippet {
            content: String::new(),
            language: "typescript".to_string(),
        };
        assert_eq!(StaticAnalysisAdapter::stage_name(&snippet), "snippet.ts");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let adapter = StaticAnalysisAdapter::new("definitely-not-a-real-binary-xyz");
        let input = ScanInput::Snippet {
            content: "eval(x)".to_string(),
            language: "javascript".to_string(),
        };
        let err = adapter.run(&input, &RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_tool_is_killed() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("slow-tool.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let adapter = StaticAnalysisAdapter::new(script.display().to_string());
        let input = ScanInput::Snippet {
            content: "eval(x)".to_string(),
            language: "javascript".to_string(),
        };
        let options = RunOptions {
            timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let err = adapter.run(&input, &options).await.unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }));

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        // SIGKILL delivery and reaping are asynchronous; poll until the
        // process is gone (a lingering zombie counts as dead)
        for _ in 0..40 {
            let alive = std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| !stat.contains(") Z "))
                .unwrap_or(false);
            if !alive {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("tool process survived the timeout");
    }

    #[tokio::test]
    async fn test_contentless_input_yields_nothing() {
        let adapter = StaticAnalysisAdapter::new("semgrep");
        let input = ScanInput::Unit(ScanUnit::new("big.bin", 99));
        let findings = adapter.run(&input, &RunOptions::default()).await.unwrap();
        assert!(findings.is_empty());
    }
}
