//! Known-vulnerability lookups against the GitHub Advisory Database.
//!
//! Dependency manifests collected during discovery are parsed for package
//! names, then each package is checked against the advisory API. Lookups are
//! best-effort: a failure here degrades the dependency phase, never the
//! session.

use serde::Deserialize;
use tracing::debug;

use super::raw::{RawAdvisoryFinding, RawFinding};
use super::AdapterError;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "sentinel-scan";
/// Advisories fetched per package.
const PER_PACKAGE_LIMIT: usize = 5;
/// Packages looked up per session; manifests can list hundreds.
pub const MAX_PACKAGES_PER_SCAN: usize = 25;

#[derive(Debug, Deserialize)]
struct Advisory {
    ghsa_id: String,
    summary: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    html_url: Option<String>,
}

pub struct AdvisoryAdapter {
    http: reqwest::Client,
    token: Option<String>,
}

impl AdvisoryAdapter {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }

    pub fn name(&self) -> &'static str {
        "advisory-db"
    }

    /// Check one package against the advisory database.
    pub async fn lookup(
        &self,
        ecosystem: &str,
        package: &str,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        let url = format!(
            "{}/advisories?ecosystem={}&affects={}&per_page={}",
            API_BASE, ecosystem, package, PER_PACKAGE_LIMIT
        );
        let mut request = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::unavailable(self.name(), e.to_string()))?;
        if !response.status().is_success() {
            return Err(AdapterError::unavailable(
                self.name(),
                format!("status {} for {}", response.status(), package),
            ));
        }
        let advisories: Vec<Advisory> = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(self.name(), e.to_string()))?;

        debug!(package, count = advisories.len(), "advisory lookup");
        Ok(advisories
            .into_iter()
            .map(|a| {
                RawFinding::Advisory(RawAdvisoryFinding {
                    id: a.ghsa_id,
                    summary: a.summary,
                    severity: a.severity,
                    package: Some(package.to_string()),
                    url: a.html_url,
                })
            })
            .collect())
    }
}

/// Extract `(ecosystem, package)` pairs from a dependency manifest. Formats
/// without a cheap text parse are skipped; lockfiles are handled through
/// their primary manifest.
pub fn dependencies_from_manifest(path: &str, content: &str) -> Vec<(String, String)> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name {
        "package.json" => parse_package_json(content),
        "requirements.txt" => parse_requirements_txt(content),
        "go.mod" => parse_go_mod(content),
        _ => Vec::new(),
    }
}

fn parse_package_json(content: &str) -> Vec<(String, String)> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return Vec::new();
    };
    let mut packages = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value[section].as_object() {
            for name in deps.keys() {
                packages.push(("npm".to_string(), name.clone()));
            }
        }
    }
    packages
}

fn parse_requirements_txt(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                return None;
            }
            let name: String = line
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
                .collect();
            (!name.is_empty()).then(|| ("pip".to_string(), name))
        })
        .collect()
}

fn parse_go_mod(content: &str) -> Vec<(String, String)> {
    let mut packages = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("require (") {
            in_block = true;
            continue;
        }
        if in_block && line == ")" {
            in_block = false;
            continue;
        }
        let module = if in_block {
            line.split_whitespace().next()
        } else if let Some(rest) = line.strip_prefix("require ") {
            rest.split_whitespace().next()
        } else {
            None
        };
        if let Some(module) = module {
            if module.contains('/') {
                packages.push(("go".to_string(), module.to_string()));
            }
        }
    }
    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_json() {
        let content = r#"{
            "name": "app",
            "dependencies": {"express": "^4.17.1", "lodash": "4.17.20"},
            "devDependencies": {"jest": "^29.0.0"}
        }"#;
        let deps = dependencies_from_manifest("package.json", content);
        assert_eq!(deps.len(), 3);
        assert!(deps.contains(&("npm".to_string(), "lodash".to_string())));
        assert!(deps.contains(&("npm".to_string(), "jest".to_string())));
    }

    #[test]
    fn test_parse_requirements_txt() {
        let content = "# pinned\nflask==2.0.1\nrequests>=2.25\n\n-r base.txt\ndjango";
        let deps = dependencies_from_manifest("api/requirements.txt", content);
        let names: Vec<&str> = deps.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["flask", "requests", "django"]);
        assert!(deps.iter().all(|(eco, _)| eco == "pip"));
    }

    #[test]
    fn test_parse_go_mod() {
        let content = "module example.com/app\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.0\n\tgolang.org/x/crypto v0.1.0\n)\nrequire github.com/pkg/errors v0.9.1\n";
        let deps = dependencies_from_manifest("go.mod", content);
        let names: Vec<&str> = deps.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "github.com/gin-gonic/gin",
                "golang.org/x/crypto",
                "github.com/pkg/errors"
            ]
        );
    }

    #[test]
    fn test_unknown_manifest_yields_nothing() {
        assert!(dependencies_from_manifest("pom.xml", "<project/>").is_empty());
        assert!(dependencies_from_manifest("package.json", "not json").is_empty());
    }
}
