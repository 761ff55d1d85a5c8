//! Scan orchestration: drives the fixed phase pipeline over a target,
//! fans out adapter calls with bounded concurrency, and folds raw results
//! into a session.
//!
//! Failure policy: an adapter or phase failure is recorded on the phase
//! outcome and the pipeline moves on. A session always completes with
//! whatever was gathered; only a missing precondition (no cloud binding for
//! a bucket scan) aborts before a session exists.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::advisory::{
    dependencies_from_manifest, AdvisoryAdapter, MAX_PACKAGES_PER_SCAN,
};
use crate::adapter::cloud::{BucketApi, CloudConfigAdapter};
use crate::adapter::pattern::PatternAdapter;
use crate::adapter::raw::{RawCloudFinding, RawFinding};
use crate::adapter::secret_detection::SecretDetectionAdapter;
use crate::adapter::static_analysis::StaticAnalysisAdapter;
use crate::adapter::{AdapterError, RulesetProfile, RunOptions, ScanInput, ToolAdapter};
use crate::config::ScanConfig;
use crate::discovery::github::{GitHubClient, RepoListing};
use crate::discovery::{Discoverer, DiscoveryLimits};
use crate::error::{Result, ScanError};
use crate::normalize::normalize;
use crate::types::{
    Finding, Phase, PhaseOutcome, ScanReport, ScanSession, ScanTarget, ScanUnit, Severity, Summary,
};

/// Objects sampled for content scanning in a bucket session.
const BUCKET_CONTENT_SAMPLES: usize = 10;

const DEADLINE_MESSAGE: &str = "deadline exceeded";

/// Advisory lookups behind a mockable seam.
#[async_trait]
pub trait AdvisorySource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(
        &self,
        ecosystem: &str,
        package: &str,
    ) -> std::result::Result<Vec<RawFinding>, AdapterError>;
}

#[async_trait]
impl AdvisorySource for AdvisoryAdapter {
    fn name(&self) -> &'static str {
        AdvisoryAdapter::name(self)
    }

    async fn lookup(
        &self,
        ecosystem: &str,
        package: &str,
    ) -> std::result::Result<Vec<RawFinding>, AdapterError> {
        AdvisoryAdapter::lookup(self, ecosystem, package).await
    }
}

/// Optional post-pipeline enrichment (LLM triage, dedup hints). Returned
/// findings are appended to the session.
#[async_trait]
pub trait Enrichment: Send + Sync {
    async fn enrich(
        &self,
        target: &ScanTarget,
        findings: &[Finding],
    ) -> std::result::Result<Vec<Finding>, AdapterError>;
}

pub struct Orchestrator {
    config: ScanConfig,
    listing: Arc<dyn RepoListing>,
    bucket_api: Option<Arc<dyn BucketApi>>,
    static_adapter: Arc<dyn ToolAdapter>,
    secret_adapter: Arc<dyn ToolAdapter>,
    pattern: PatternAdapter,
    advisory: Arc<dyn AdvisorySource>,
    enrichment: Option<Arc<dyn Enrichment>>,
}

impl Orchestrator {
    /// Wire the production adapters from configuration. Test seams are the
    /// `with_*` methods below.
    pub fn new(config: ScanConfig) -> Self {
        let listing = Arc::new(GitHubClient::new(config.github_token.clone()));
        let static_adapter = Arc::new(StaticAnalysisAdapter::new(&config.static_tool_command));
        let secret_adapter = Arc::new(SecretDetectionAdapter::new(&config.secret_tool_command));
        let advisory = Arc::new(AdvisoryAdapter::new(config.github_token.clone()));
        Self {
            listing,
            bucket_api: None,
            static_adapter,
            secret_adapter,
            pattern: PatternAdapter::new(),
            advisory,
            enrichment: None,
            config,
        }
    }

    pub fn with_listing(mut self, listing: Arc<dyn RepoListing>) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_bucket_api(mut self, api: Arc<dyn BucketApi>) -> Self {
        self.bucket_api = Some(api);
        self
    }

    pub fn with_static_adapter(mut self, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.static_adapter = adapter;
        self
    }

    pub fn with_secret_adapter(mut self, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.secret_adapter = adapter;
        self
    }

    pub fn with_advisory_source(mut self, source: Arc<dyn AdvisorySource>) -> Self {
        self.advisory = source;
        self
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Scan a remote repository end to end.
    pub async fn scan_repository(
        &self,
        owner: &str,
        name: &str,
        deadline: Option<Duration>,
    ) -> Result<ScanReport> {
        let target = ScanTarget::Repository {
            owner: owner.to_string(),
            name: name.to_string(),
        };
        info!(%target, "starting repository scan");
        let report = self
            .run_pipeline(target, deadline, self.config.repo_timeout, RulesetProfile::Full)
            .await;
        Ok(report)
    }

    /// Scan a single pasted snippet with the fast ruleset profile.
    pub async fn scan_snippet(
        &self,
        content: &str,
        language: &str,
        deadline: Option<Duration>,
    ) -> Result<ScanReport> {
        let target = ScanTarget::Snippet {
            language: language.to_string(),
        };
        info!(%target, bytes = content.len(), "starting snippet scan");
        let label = format!(
            "snippet.{}",
            crate::adapter::static_analysis::extension_for_language(language)
        );
        let mut unit = ScanUnit::new(label, content.len() as u64);
        unit.content = Some(content.to_string());
        let report = self
            .run_units_pipeline(
                target,
                vec![unit],
                Vec::new(),
                deadline,
                self.config.snippet_timeout,
                RulesetProfile::Fast,
                Some(language.to_string()),
            )
            .await;
        Ok(report)
    }

    /// Audit a storage bucket: configuration checks plus content sampling.
    pub async fn scan_bucket(
        &self,
        bucket: &str,
        deadline: Option<Duration>,
    ) -> Result<ScanReport> {
        if self.bucket_api.is_none() {
            return Err(ScanError::config(
                "bucket scanning requires a cloud storage binding",
            ));
        }
        let target = ScanTarget::Bucket {
            name: bucket.to_string(),
        };
        info!(%target, "starting bucket scan");
        let report = self
            .run_pipeline(target, deadline, self.config.repo_timeout, RulesetProfile::Full)
            .await;
        Ok(report)
    }

    async fn run_pipeline(
        &self,
        target: ScanTarget,
        deadline: Option<Duration>,
        tool_timeout: Duration,
        profile: RulesetProfile,
    ) -> ScanReport {
        let deadline = deadline.map(|d| Instant::now() + d);
        let started = std::time::Instant::now();
        let mut session = ScanSession::new(target.clone());

        // phase 1: discovery
        let mut units: Vec<ScanUnit> = Vec::new();
        match self.run_phase(deadline, self.discover(&target)).await {
            PhaseResult::Done(Ok(discovered)) => {
                units = discovered;
                self.set_unit_metrics(&mut session, &units);
                session.phases.set(Phase::Discovery, PhaseOutcome::ok());
            }
            PhaseResult::Done(Err(message)) => {
                session
                    .phases
                    .set(Phase::Discovery, PhaseOutcome::failed(message));
            }
            PhaseResult::Expired => {
                self.mark_remaining(&mut session, Phase::Discovery);
            }
        }

        self.run_scan_phases(&mut session, &units, deadline, tool_timeout, profile, None)
            .await;
        self.finish(session, started)
    }

    /// Pipeline variant for targets whose units are known up front.
    #[allow(clippy::too_many_arguments)]
    async fn run_units_pipeline(
        &self,
        target: ScanTarget,
        units: Vec<ScanUnit>,
        warnings: Vec<String>,
        deadline: Option<Duration>,
        tool_timeout: Duration,
        profile: RulesetProfile,
        language: Option<String>,
    ) -> ScanReport {
        let deadline = deadline.map(|d| Instant::now() + d);
        let started = std::time::Instant::now();
        let mut session = ScanSession::new(target);
        for warning in warnings {
            warn!(warning, "discovery warning");
        }
        self.set_unit_metrics(&mut session, &units);
        session.phases.set(Phase::Discovery, PhaseOutcome::ok());

        self.run_scan_phases(
            &mut session,
            &units,
            deadline,
            tool_timeout,
            profile,
            language,
        )
        .await;
        self.finish(session, started)
    }

    /// Units without content and readable units past the analysis cap both
    /// count as skipped.
    fn set_unit_metrics(&self, session: &mut ScanSession, units: &[ScanUnit]) {
        let readable = units.iter().filter(|u| u.content.is_some()).count();
        session.metrics.units_scanned = readable.min(self.config.max_analyzed_units);
        session.metrics.units_skipped = units.len() - session.metrics.units_scanned;
    }

    async fn run_scan_phases(
        &self,
        session: &mut ScanSession,
        units: &[ScanUnit],
        deadline: Option<Instant>,
        tool_timeout: Duration,
        profile: RulesetProfile,
        language: Option<String>,
    ) {
        if session.phases.get(Phase::Discovery).error.as_deref() == Some(DEADLINE_MESSAGE) {
            return;
        }

        // phase 2: static analysis (cloud configuration audit for buckets)
        let result = self
            .run_phase(
                deadline,
                self.static_phase(session, units, tool_timeout, profile, language.as_deref()),
            )
            .await;
        match result {
            PhaseResult::Done((findings, error)) => {
                session.findings.extend(findings);
                session.phases.set(
                    Phase::StaticAnalysis,
                    error.map_or_else(PhaseOutcome::ok, PhaseOutcome::failed),
                );
            }
            PhaseResult::Expired => {
                self.mark_remaining(session, Phase::StaticAnalysis);
                return;
            }
        }

        // phase 3: secret detection
        let result = self
            .run_phase(
                deadline,
                self.secret_phase(session, units, tool_timeout, language.as_deref()),
            )
            .await;
        match result {
            PhaseResult::Done((findings, error)) => {
                session.findings.extend(findings);
                session.phases.set(
                    Phase::SecretDetection,
                    error.map_or_else(PhaseOutcome::ok, PhaseOutcome::failed),
                );
            }
            PhaseResult::Expired => {
                self.mark_remaining(session, Phase::SecretDetection);
                return;
            }
        }

        // phase 4: dependency and compliance lookups
        match self
            .run_phase(deadline, self.dependency_phase(units))
            .await
        {
            PhaseResult::Done((findings, error)) => {
                session.findings.extend(findings);
                session.phases.set(
                    Phase::DependencyAndCompliance,
                    error.map_or_else(PhaseOutcome::ok, PhaseOutcome::failed),
                );
            }
            PhaseResult::Expired => {
                self.mark_remaining(session, Phase::DependencyAndCompliance);
                return;
            }
        }

        // phase 5: optional enrichment
        if !self.config.enable_ai_enrichment {
            session.phases.set(Phase::AiEnrichment, PhaseOutcome::ok());
            return;
        }
        let Some(enrichment) = &self.enrichment else {
            session.phases.set(
                Phase::AiEnrichment,
                PhaseOutcome::failed("enrichment engine not configured"),
            );
            return;
        };
        let result = self
            .run_phase(
                deadline,
                enrichment.enrich(&session.target, &session.findings),
            )
            .await;
        match result {
            PhaseResult::Done(Ok(extra)) => {
                session.findings.extend(extra);
                session.phases.set(Phase::AiEnrichment, PhaseOutcome::ok());
            }
            PhaseResult::Done(Err(e)) => {
                session
                    .phases
                    .set(Phase::AiEnrichment, PhaseOutcome::failed(e.to_string()));
            }
            PhaseResult::Expired => {
                self.mark_remaining(session, Phase::AiEnrichment);
            }
        }
    }

    fn finish(&self, mut session: ScanSession, started: std::time::Instant) -> ScanReport {
        session.summary = Summary::from_findings(&session.findings);
        session.metrics.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            id = %session.id,
            findings = session.findings.len(),
            duration_ms = session.metrics.duration_ms,
            "scan complete"
        );
        ScanReport::from_session(session)
    }

    async fn run_phase<F: std::future::Future>(
        &self,
        deadline: Option<Instant>,
        body: F,
    ) -> PhaseResult<F::Output> {
        match deadline {
            Some(at) => {
                if Instant::now() >= at {
                    return PhaseResult::Expired;
                }
                match tokio::time::timeout_at(at, body).await {
                    Ok(output) => PhaseResult::Done(output),
                    Err(_) => PhaseResult::Expired,
                }
            }
            None => PhaseResult::Done(body.await),
        }
    }

    /// Mark `from` and every later phase as expired.
    fn mark_remaining(&self, session: &mut ScanSession, from: Phase) {
        let mut seen = false;
        for phase in Phase::all() {
            if phase == from {
                seen = true;
            }
            if seen {
                session
                    .phases
                    .set(phase, PhaseOutcome::failed(DEADLINE_MESSAGE));
            }
        }
        warn!(phase = %from, "scan deadline exceeded");
    }

    async fn discover(
        &self,
        target: &ScanTarget,
    ) -> std::result::Result<Vec<ScanUnit>, String> {
        match target {
            ScanTarget::Repository { owner, name } => {
                let limits = DiscoveryLimits {
                    max_units: self.config.max_units,
                    max_depth: self.config.max_depth,
                    max_unit_size: self.config.max_unit_size,
                };
                let discoverer = Discoverer::new(self.listing.as_ref(), limits)
                    .with_request_delay(self.config.request_delay);
                let discovery = discoverer
                    .discover(owner, name)
                    .await
                    .map_err(|e| e.to_string())?;
                for warning in &discovery.warnings {
                    warn!(warning, "discovery warning");
                }
                Ok(discovery.units)
            }
            ScanTarget::Bucket { name } => self.discover_bucket(name).await,
            ScanTarget::Snippet { .. } => Ok(Vec::new()),
        }
    }

    async fn discover_bucket(&self, bucket: &str) -> std::result::Result<Vec<ScanUnit>, String> {
        let Some(api) = &self.bucket_api else {
            return Err("no cloud storage binding".to_string());
        };
        let objects = api
            .list_objects(bucket, self.config.max_units)
            .await
            .map_err(|e| e.to_string())?;
        let mut units = Vec::new();
        let mut sampled = 0usize;
        for object in objects {
            let mut unit = ScanUnit::new(object.key.clone(), object.size);
            if sampled < BUCKET_CONTENT_SAMPLES && object.size <= self.config.max_unit_size {
                match api.object_content(bucket, &object.key).await {
                    Ok(content) => {
                        unit.content = Some(content);
                        sampled += 1;
                    }
                    Err(e) => warn!(key = %object.key, error = %e, "object fetch failed"),
                }
            }
            units.push(unit);
        }
        Ok(units)
    }

    /// Static analysis over units: in-process patterns for every readable
    /// unit, the subprocess scanner for the first `max_analyzed_units`
    /// non-manifest units. For buckets this phase audits configuration
    /// instead.
    async fn static_phase(
        &self,
        session: &ScanSession,
        units: &[ScanUnit],
        tool_timeout: Duration,
        profile: RulesetProfile,
        language: Option<&str>,
    ) -> (Vec<Finding>, Option<String>) {
        if let ScanTarget::Bucket { name } = &session.target {
            return self.bucket_config_phase(name).await;
        }

        let mut findings = Vec::new();
        for unit in units.iter().filter(|u| !u.dependency_manifest) {
            let Some(content) = &unit.content else {
                continue;
            };
            let unit_language = language.or_else(|| {
                unit.extension()
                    .and_then(|e| crate::discovery::patterns::language_for_extension(&e))
            });
            for raw in self
                .pattern
                .detect_vulnerabilities(content, &unit.path, unit_language)
            {
                findings.push(normalize(&raw, "pattern-matcher"));
            }
        }

        let options = RunOptions {
            profile,
            timeout: tool_timeout,
            verify_secrets: false,
        };
        let selected: Vec<&ScanUnit> = units
            .iter()
            .filter(|u| u.content.is_some() && !u.dependency_manifest)
            .take(self.config.max_analyzed_units)
            .collect();
        let (tool_findings, error) = self
            .fan_out(&self.static_adapter, &selected, &options)
            .await;
        findings.extend(tool_findings);
        (findings, error)
    }

    async fn bucket_config_phase(&self, bucket: &str) -> (Vec<Finding>, Option<String>) {
        let Some(api) = &self.bucket_api else {
            return (Vec::new(), Some("no cloud storage binding".to_string()));
        };
        let adapter = CloudConfigAdapter::new(Arc::clone(api));
        let input = ScanInput::Bucket {
            name: bucket.to_string(),
        };
        match adapter.run(&input, &RunOptions::default()).await {
            Ok(raw) => (
                raw.iter().map(|r| normalize(r, adapter.name())).collect(),
                None,
            ),
            Err(e) => (Vec::new(), Some(e.to_string())),
        }
    }

    /// Secret detection: in-process patterns over every readable unit, the
    /// subprocess detector over the first `max_analyzed_units`. Sensitive
    /// filenames in buckets are findings in their own right.
    async fn secret_phase(
        &self,
        session: &ScanSession,
        units: &[ScanUnit],
        tool_timeout: Duration,
        _language: Option<&str>,
    ) -> (Vec<Finding>, Option<String>) {
        let mut findings = Vec::new();

        if let ScanTarget::Bucket { name } = &session.target {
            for unit in units.iter().filter(|u| u.sensitive_name) {
                findings.push(sensitive_object_finding(name, &unit.path));
            }
        }

        for unit in units {
            let Some(content) = &unit.content else {
                continue;
            };
            for raw in self.pattern.detect_secrets(content, &unit.path) {
                findings.push(normalize(&raw, "pattern-matcher"));
            }
        }

        let options = RunOptions {
            profile: RulesetProfile::Fast,
            timeout: tool_timeout,
            verify_secrets: self.config.verify_secrets,
        };
        let selected: Vec<&ScanUnit> = units
            .iter()
            .filter(|u| u.content.is_some())
            .take(self.config.max_analyzed_units)
            .collect();
        let (tool_findings, error) = self
            .fan_out(&self.secret_adapter, &selected, &options)
            .await;
        findings.extend(tool_findings);
        (findings, error)
    }

    /// Advisory lookups for packages named in dependency manifests.
    /// Best-effort: the phase only fails when every lookup fails.
    async fn dependency_phase(&self, units: &[ScanUnit]) -> (Vec<Finding>, Option<String>) {
        let mut packages: Vec<(String, String)> = Vec::new();
        for unit in units.iter().filter(|u| u.dependency_manifest) {
            if let Some(content) = &unit.content {
                packages.extend(dependencies_from_manifest(&unit.path, content));
            }
        }
        // the same package can appear in several manifests
        let mut seen = HashSet::new();
        packages.retain(|p| seen.insert(p.clone()));
        packages.truncate(MAX_PACKAGES_PER_SCAN);
        if packages.is_empty() {
            return (Vec::new(), None);
        }
        debug!(count = packages.len(), "advisory lookups");

        let results: Vec<std::result::Result<Vec<RawFinding>, AdapterError>> =
            stream::iter(packages.iter())
                .map(|(ecosystem, package)| {
                    let advisory = Arc::clone(&self.advisory);
                    async move { advisory.lookup(ecosystem, package).await }
                })
                .buffered(self.config.max_concurrent_calls)
                .collect()
                .await;

        let mut findings = Vec::new();
        let mut failures = 0usize;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(raw) => {
                    findings.extend(raw.iter().map(|r| normalize(r, self.advisory.name())));
                }
                Err(e) => {
                    failures += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        let error = (failures == packages.len()).then_some(first_error).flatten();
        (findings, error)
    }

    /// Run one adapter across units with bounded concurrency, preserving unit
    /// order in the merged output. The first adapter error fails the phase
    /// but findings from other units are kept.
    async fn fan_out(
        &self,
        adapter: &Arc<dyn ToolAdapter>,
        units: &[&ScanUnit],
        options: &RunOptions,
    ) -> (Vec<Finding>, Option<String>) {
        let results: Vec<std::result::Result<Vec<RawFinding>, AdapterError>> =
            stream::iter(units.iter())
                .map(|unit| {
                    let adapter = Arc::clone(adapter);
                    let options = options.clone();
                    let input = ScanInput::Unit((*unit).clone());
                    async move { adapter.run(&input, &options).await }
                })
                .buffered(self.config.max_concurrent_calls)
                .collect()
                .await;

        let mut findings = Vec::new();
        let mut error = None;
        for result in results {
            match result {
                Ok(raw) => findings.extend(raw.iter().map(|r| normalize(r, adapter.name()))),
                Err(e) => {
                    warn!(tool = adapter.name(), error = %e, "adapter call failed");
                    error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        (findings, error)
    }
}

/// A sensitive filename sitting in shared storage is itself an exposure.
fn sensitive_object_finding(bucket: &str, key: &str) -> Finding {
    normalize(
        &RawFinding::CloudConfig(RawCloudFinding {
            check: "sensitive-object",
            severity: Severity::High,
            category: "data-exposure",
            resource: format!("{}/{}", bucket, key),
            message: format!("Object '{}' looks sensitive by name", key),
            recommendation: "Remove the object from shared storage or restrict access to it",
        }),
        "cloud-config",
    )
}

enum PhaseResult<T> {
    Done(T),
    Expired,
}
