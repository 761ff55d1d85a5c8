//! Scan configuration: tuning constants, env loading, builder overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Hard cap on units collected during discovery.
pub const DEFAULT_MAX_UNITS: usize = 30;
/// Directory recursion depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 3;
/// Units above this size are recorded metadata-only.
pub const DEFAULT_MAX_UNIT_SIZE: u64 = 1024 * 1024;
/// Only the first N units go through the expensive subprocess adapters.
pub const DEFAULT_MAX_ANALYZED_UNITS: usize = 20;
/// Fixed delay between consecutive remote listing requests.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
/// Upper bound on concurrent adapter calls within a phase.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 10;
/// Per-tool timeout for single-snippet scans.
pub const DEFAULT_SNIPPET_TIMEOUT_SECS: u64 = 30;
/// Per-tool timeout for whole-repository scans.
pub const DEFAULT_REPO_TIMEOUT_SECS: u64 = 180;
/// How long persisted sessions are kept before expiry.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
/// Bounded capacity of the in-memory fallback store.
pub const DEFAULT_MEMORY_STORE_CAPACITY: usize = 100;

/// Runtime configuration for a scan. Defaults match the hosted service;
/// everything is overridable through the builder methods or CLI flags.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub github_token: Option<String>,
    pub static_tool_command: String,
    pub secret_tool_command: String,
    pub verify_secrets: bool,
    pub enable_ai_enrichment: bool,
    pub max_units: usize,
    pub max_depth: usize,
    pub max_unit_size: u64,
    pub max_analyzed_units: usize,
    pub request_delay: Duration,
    pub max_concurrent_calls: usize,
    pub snippet_timeout: Duration,
    pub repo_timeout: Duration,
    pub session_ttl: Duration,
    pub data_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            static_tool_command: "semgrep".to_string(),
            secret_tool_command: "trufflehog".to_string(),
            verify_secrets: false,
            enable_ai_enrichment: false,
            max_units: DEFAULT_MAX_UNITS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_unit_size: DEFAULT_MAX_UNIT_SIZE,
            max_analyzed_units: DEFAULT_MAX_ANALYZED_UNITS,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            snippet_timeout: Duration::from_secs(DEFAULT_SNIPPET_TIMEOUT_SECS),
            repo_timeout: Duration::from_secs(DEFAULT_REPO_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            data_dir: PathBuf::from("./data/sessions"),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read environment overrides once, at process start.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        if let Some(cmd) = env::var("SENTINEL_STATIC_TOOL").ok().filter(|c| !c.is_empty()) {
            config.static_tool_command = cmd;
        }
        if let Some(cmd) = env::var("SENTINEL_SECRET_TOOL").ok().filter(|c| !c.is_empty()) {
            config.secret_tool_command = cmd;
        }
        if let Some(dir) = env::var("SENTINEL_DATA_DIR").ok().filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var("SENTINEL_MAX_UNITS") {
            if let Ok(n) = value.parse() {
                config.max_units = n;
            }
        }
        if let Ok(value) = env::var("SENTINEL_SESSION_TTL_SECS") {
            if let Ok(n) = value.parse() {
                config.session_ttl = Duration::from_secs(n);
            }
        }
        config
    }

    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    pub fn with_max_units(mut self, max_units: usize) -> Self {
        self.max_units = max_units;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_max_concurrent_calls(mut self, limit: usize) -> Self {
        self.max_concurrent_calls = limit.max(1);
        self
    }

    pub fn with_verify_secrets(mut self, verify: bool) -> Self {
        self.verify_secrets = verify;
        self
    }

    pub fn with_ai_enrichment(mut self, enabled: bool) -> Self {
        self.enable_ai_enrichment = enabled;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_timeouts(mut self, snippet: Duration, repo: Duration) -> Self {
        self.snippet_timeout = snippet;
        self.repo_timeout = repo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_units, 30);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_analyzed_units, 20);
        assert_eq!(config.max_concurrent_calls, 10);
        assert!(!config.verify_secrets);
        assert!(!config.enable_ai_enrichment);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ScanConfig::new()
            .with_max_units(5)
            .with_max_depth(1)
            .with_verify_secrets(true)
            .with_request_delay(Duration::ZERO);
        assert_eq!(config.max_units, 5);
        assert_eq!(config.max_depth, 1);
        assert!(config.verify_secrets);
        assert_eq!(config.request_delay, Duration::ZERO);
    }

    #[test]
    fn test_concurrency_floor() {
        let config = ScanConfig::new().with_max_concurrent_calls(0);
        assert_eq!(config.max_concurrent_calls, 1);
    }
}
