//! GitHub contents-API client behind the `RepoListing` trait.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use super::DiscoveryError;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "sentinel-scan";

/// Repository metadata returned before traversal starts.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Read-only view of a remote repository. The orchestrator and discovery only
/// ever talk to this trait; tests substitute an in-memory tree.
#[async_trait]
pub trait RepoListing: Send + Sync {
    async fn repo_metadata(&self, owner: &str, name: &str) -> Result<RepoMetadata, DiscoveryError>;

    async fn list_dir(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, DiscoveryError>;

    async fn fetch_content(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<String, DiscoveryError>;
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct FileContents {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Authenticated (or anonymous) client for the GitHub REST API.
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        path: &str,
    ) -> Result<T, DiscoveryError> {
        let response = self.request(url).send().await?;
        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(DiscoveryError::RateLimited {
                path: path.to_string(),
            });
        }
        if status.as_u16() == 404 {
            return Err(DiscoveryError::NotFound {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DiscoveryError::Api {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RepoListing for GitHubClient {
    async fn repo_metadata(&self, owner: &str, name: &str) -> Result<RepoMetadata, DiscoveryError> {
        let url = format!("{}/repos/{}/{}", API_BASE, owner, name);
        self.get_json(&url, "").await
    }

    async fn list_dir(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, DiscoveryError> {
        let url = format!("{}/repos/{}/{}/contents/{}", API_BASE, owner, name, path);
        debug!(path, "listing directory");
        let entries: Vec<ContentsEntry> = self.get_json(&url, path).await?;
        Ok(entries
            .into_iter()
            .map(|e| RemoteEntry {
                kind: match e.entry_type.as_str() {
                    "file" => EntryKind::File,
                    "dir" => EntryKind::Dir,
                    _ => EntryKind::Other,
                },
                name: e.name,
                path: e.path,
                size: e.size,
            })
            .collect())
    }

    async fn fetch_content(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<String, DiscoveryError> {
        let url = format!("{}/repos/{}/{}/contents/{}", API_BASE, owner, name, path);
        let file: FileContents = self.get_json(&url, path).await?;
        if file.encoding != "base64" {
            return Err(DiscoveryError::Decode {
                path: path.to_string(),
                message: format!("unexpected encoding: {}", file.encoding),
            });
        }
        let raw: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| DiscoveryError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|e| DiscoveryError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
