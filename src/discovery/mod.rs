//! Remote resource discovery.
//!
//! Walks a repository tree depth-first through the contents API, collecting
//! `ScanUnit`s under a hard unit budget and depth limit. Rate limiting on a
//! directory abandons that branch with a soft warning; the rest of the
//! traversal continues. A fixed delay between listing requests keeps the
//! scanner polite toward the upstream API.

pub mod github;
pub mod patterns;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::ScanUnit;
use github::{EntryKind, RepoListing, RepoMetadata};

/// Discovery failure modes.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Upstream returned 403/429 while listing a path.
    #[error("rate limited while listing '{path}'")]
    RateLimited { path: String },

    /// Resource does not exist or is not visible with current credentials.
    #[error("not found: '{path}'")]
    NotFound { path: String },

    /// Any other non-success API status.
    #[error("API error {status} for '{path}'")]
    Api { status: u16, path: String },

    /// Content could not be decoded to UTF-8 text.
    #[error("failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Limits applied during traversal.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryLimits {
    pub max_units: usize,
    pub max_depth: usize,
    pub max_unit_size: u64,
}

/// Result of a discovery pass. Warnings are soft failures (abandoned
/// branches, unreadable files) that did not stop the traversal.
#[derive(Debug, Default)]
pub struct Discovery {
    pub units: Vec<ScanUnit>,
    pub warnings: Vec<String>,
    pub metadata: Option<RepoMetadata>,
}

/// Depth-first repository walker over a `RepoListing`.
pub struct Discoverer<'a> {
    listing: &'a dyn RepoListing,
    limits: DiscoveryLimits,
    request_delay: Duration,
}

impl<'a> Discoverer<'a> {
    pub fn new(listing: &'a dyn RepoListing, limits: DiscoveryLimits) -> Self {
        Self {
            listing,
            limits,
            request_delay: Duration::from_millis(crate::config::DEFAULT_REQUEST_DELAY_MS),
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Both budget checks live here so the walk has a single chokepoint.
    fn should_descend(&self, depth: usize, collected: usize) -> bool {
        depth <= self.limits.max_depth && collected < self.limits.max_units
    }

    /// Walk the repository tree and collect scan units.
    ///
    /// Returns `Err` only when the repository itself is unreachable (the root
    /// listing fails); everything past the root degrades to warnings.
    pub async fn discover(&self, owner: &str, name: &str) -> Result<Discovery, DiscoveryError> {
        let mut discovery = Discovery::default();

        match self.listing.repo_metadata(owner, name).await {
            Ok(metadata) => discovery.metadata = Some(metadata),
            Err(e) => {
                warn!(owner, name, error = %e, "repository metadata unavailable");
                discovery.warnings.push(format!("metadata: {}", e));
            }
        }

        // Explicit stack; entries pushed in reverse so listing order is
        // preserved depth-first.
        let mut stack: Vec<(String, usize)> = vec![(String::new(), 1)];
        let mut first_request = true;

        while let Some((dir, depth)) = stack.pop() {
            if !self.should_descend(depth, discovery.units.len()) {
                continue;
            }
            if !first_request {
                tokio::time::sleep(self.request_delay).await;
            }
            first_request = false;

            let entries = match self.listing.list_dir(owner, name, &dir).await {
                Ok(entries) => entries,
                Err(e @ DiscoveryError::RateLimited { .. }) => {
                    if dir.is_empty() {
                        return Err(e);
                    }
                    warn!(dir, "rate limited, abandoning branch");
                    discovery.warnings.push(e.to_string());
                    continue;
                }
                Err(e) => {
                    if dir.is_empty() {
                        return Err(e);
                    }
                    warn!(dir, error = %e, "listing failed, skipping branch");
                    discovery.warnings.push(e.to_string());
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                if discovery.units.len() >= self.limits.max_units {
                    break;
                }
                match entry.kind {
                    EntryKind::Dir => {
                        if !patterns::is_skippable_dir(&entry.name) {
                            subdirs.push(entry.path);
                        }
                    }
                    EntryKind::File => {
                        let unit = self.collect_file(owner, name, &entry.path, entry.size, &mut discovery.warnings).await;
                        discovery.units.push(unit);
                    }
                    EntryKind::Other => {}
                }
            }
            for sub in subdirs.into_iter().rev() {
                stack.push((sub, depth + 1));
            }
        }

        debug!(
            units = discovery.units.len(),
            warnings = discovery.warnings.len(),
            "discovery complete"
        );
        Ok(discovery)
    }

    /// Oversized files are kept metadata-only; unreadable files degrade to
    /// metadata-only with a warning.
    async fn collect_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        size: u64,
        warnings: &mut Vec<String>,
    ) -> ScanUnit {
        let unit = ScanUnit::new(path, size);
        if size > self.limits.max_unit_size {
            debug!(path, size, "unit over size cap, metadata only");
            return unit;
        }
        tokio::time::sleep(self.request_delay / 2).await;
        match self.listing.fetch_content(owner, name, path).await {
            Ok(content) => unit.with_content(content),
            Err(e) => {
                warn!(path, error = %e, "content fetch failed");
                warnings.push(format!("{}: {}", path, e));
                unit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::github::{RemoteEntry, RepoMetadata};
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory repository tree keyed by directory path.
    struct FakeRepo {
        dirs: HashMap<String, Vec<RemoteEntry>>,
        contents: HashMap<String, String>,
        rate_limited_dirs: Vec<String>,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                dirs: HashMap::new(),
                contents: HashMap::new(),
                rate_limited_dirs: Vec::new(),
            }
        }

        fn dir(mut self, path: &str, entries: Vec<RemoteEntry>) -> Self {
            self.dirs.insert(path.to_string(), entries);
            self
        }

        fn file_content(mut self, path: &str, content: &str) -> Self {
            self.contents.insert(path.to_string(), content.to_string());
            self
        }

        fn rate_limit(mut self, dir: &str) -> Self {
            self.rate_limited_dirs.push(dir.to_string());
            self
        }
    }

    fn file(path: &str, size: u64) -> RemoteEntry {
        RemoteEntry {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
            size,
        }
    }

    fn dir(path: &str) -> RemoteEntry {
        RemoteEntry {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            kind: EntryKind::Dir,
            size: 0,
        }
    }

    #[async_trait]
    impl RepoListing for FakeRepo {
        async fn repo_metadata(
            &self,
            owner: &str,
            name: &str,
        ) -> Result<RepoMetadata, DiscoveryError> {
            Ok(RepoMetadata {
                full_name: format!("{}/{}", owner, name),
                default_branch: "main".to_string(),
                private: false,
                size: 42,
            })
        }

        async fn list_dir(
            &self,
            _owner: &str,
            _name: &str,
            path: &str,
        ) -> Result<Vec<RemoteEntry>, DiscoveryError> {
            if self.rate_limited_dirs.iter().any(|d| d == path) {
                return Err(DiscoveryError::RateLimited {
                    path: path.to_string(),
                });
            }
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| DiscoveryError::NotFound {
                    path: path.to_string(),
                })
        }

        async fn fetch_content(
            &self,
            _owner: &str,
            _name: &str,
            path: &str,
        ) -> Result<String, DiscoveryError> {
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| DiscoveryError::NotFound {
                    path: path.to_string(),
                })
        }
    }

    fn limits(max_units: usize, max_depth: usize) -> DiscoveryLimits {
        DiscoveryLimits {
            max_units,
            max_depth,
            max_unit_size: 1024 * 1024,
        }
    }

    fn discoverer<'a>(repo: &'a FakeRepo, l: DiscoveryLimits) -> Discoverer<'a> {
        Discoverer::new(repo, l).with_request_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_collects_files_depth_first() {
        let repo = FakeRepo::new()
            .dir(
                "",
                vec![dir("src"), file("README.md", 100), file("package.json", 50)],
            )
            .dir("src", vec![file("src/index.js", 200)])
            .file_content("README.md", "# readme")
            .file_content("package.json", "{}")
            .file_content("src/index.js", "console.log(1)");

        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();

        let paths: Vec<&str> = discovery.units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "package.json", "src/index.js"]);
        assert_eq!(discovery.metadata.unwrap().default_branch, "main");
        assert!(discovery.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_unit_budget_is_exact() {
        let entries: Vec<RemoteEntry> = (0..10).map(|i| file(&format!("f{}.js", i), 10)).collect();
        let mut repo = FakeRepo::new().dir("", entries);
        for i in 0..10 {
            repo = repo.file_content(&format!("f{}.js", i), "x");
        }

        let discovery = discoverer(&repo, limits(4, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        assert_eq!(discovery.units.len(), 4);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let repo = FakeRepo::new()
            .dir("", vec![dir("a")])
            .dir("a", vec![dir("a/b")])
            .dir("a/b", vec![dir("a/b/c")])
            .dir("a/b/c", vec![file("a/b/c/deep.js", 10)]);

        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        // depth 4 directory is never listed
        assert!(discovery.units.is_empty());
    }

    #[tokio::test]
    async fn test_skips_vendored_dirs() {
        let repo = FakeRepo::new()
            .dir("", vec![dir("node_modules"), file("app.js", 10)])
            .file_content("app.js", "x");

        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        assert_eq!(discovery.units.len(), 1);
        assert_eq!(discovery.units[0].path, "app.js");
    }

    #[tokio::test]
    async fn test_rate_limited_branch_becomes_warning() {
        let repo = FakeRepo::new()
            .dir("", vec![dir("locked"), file("app.js", 10)])
            .file_content("app.js", "x")
            .rate_limit("locked");

        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        assert_eq!(discovery.units.len(), 1);
        assert_eq!(discovery.warnings.len(), 1);
        assert!(discovery.warnings[0].contains("rate limited"));
    }

    #[tokio::test]
    async fn test_rate_limited_root_fails() {
        let repo = FakeRepo::new().rate_limit("");
        let err = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_oversized_file_kept_metadata_only() {
        let repo = FakeRepo::new().dir("", vec![file("big.bin", 10 * 1024 * 1024)]);
        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        assert_eq!(discovery.units.len(), 1);
        assert!(discovery.units[0].content.is_none());
        assert_eq!(discovery.units[0].size_bytes, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_unreadable_file_degrades_to_metadata() {
        // no content registered for app.js
        let repo = FakeRepo::new().dir("", vec![file("app.js", 10)]);
        let discovery = discoverer(&repo, limits(30, 3))
            .discover("acme", "api")
            .await
            .unwrap();
        assert_eq!(discovery.units.len(), 1);
        assert!(discovery.units[0].content.is_none());
        assert_eq!(discovery.warnings.len(), 1);
    }
}
