//! Cloud storage configuration auditor.
//!
//! The provider SDK sits behind `BucketApi`; this adapter only sees the
//! normalized configuration view and applies a fixed table of checks, each
//! with a pinned severity and category.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::types::Severity;

use super::raw::{RawCloudFinding, RawFinding};
use super::{AdapterError, RunOptions, ScanInput, ToolAdapter};

/// Normalized bucket configuration as read through the provider API.
#[derive(Debug, Clone, Default)]
pub struct BucketConfig {
    pub encryption_enabled: bool,
    pub versioning_enabled: bool,
    pub logging_enabled: bool,
    pub acl_grants: Vec<AclGrant>,
    pub policy: Option<serde_json::Value>,
    pub public_access_block: Option<PublicAccessBlock>,
}

#[derive(Debug, Clone)]
pub struct AclGrant {
    /// Grantee group URI, when the grant targets a group.
    pub grantee_uri: Option<String>,
    pub permission: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn fully_enabled(&self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }
}

/// Summary of one stored object, used to pick content-scan candidates.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// Read-only view of a storage bucket. The concrete SDK binding is injected
/// at the composition root; tests use in-memory fakes.
#[async_trait]
pub trait BucketApi: Send + Sync {
    async fn bucket_config(&self, bucket: &str) -> Result<BucketConfig, AdapterError>;

    async fn list_objects(
        &self,
        bucket: &str,
        max: usize,
    ) -> Result<Vec<ObjectSummary>, AdapterError>;

    async fn object_content(&self, bucket: &str, key: &str) -> Result<String, AdapterError>;
}

const PUBLIC_GROUP_URIS: &[&str] = &[
    "http://acs.amazonaws.com/groups/global/AllUsers",
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers",
];

/// Applies the configuration check table to one bucket.
pub struct CloudConfigAdapter {
    api: Arc<dyn BucketApi>,
}

impl CloudConfigAdapter {
    pub fn new(api: Arc<dyn BucketApi>) -> Self {
        Self { api }
    }

    /// Run every check against a fetched configuration.
    pub fn audit(bucket: &str, config: &BucketConfig) -> Vec<RawFinding> {
        let mut findings = Vec::new();
        let mut push = |check, severity, category, message: String, recommendation| {
            findings.push(RawFinding::CloudConfig(RawCloudFinding {
                check,
                severity,
                category,
                resource: bucket.to_string(),
                message,
                recommendation,
            }));
        };

        if !config.encryption_enabled {
            push(
                "encryption-disabled",
                Severity::High,
                "encryption",
                format!("Bucket '{}' has no default encryption configured", bucket),
                "Enable default server-side encryption (SSE-S3 or SSE-KMS) on the bucket",
            );
        }
        if !config.versioning_enabled {
            push(
                "versioning-disabled",
                Severity::Medium,
                "data-protection",
                format!("Bucket '{}' has object versioning disabled", bucket),
                "Enable versioning to protect against accidental deletion and overwrite",
            );
        }
        if !config.logging_enabled {
            push(
                "access-logging-disabled",
                Severity::Medium,
                "logging",
                format!("Bucket '{}' has server access logging disabled", bucket),
                "Enable access logging to a dedicated audit bucket",
            );
        }

        for grant in &config.acl_grants {
            let Some(uri) = &grant.grantee_uri else {
                continue;
            };
            if !PUBLIC_GROUP_URIS.iter().any(|p| p == uri) {
                continue;
            }
            let permission = grant.permission.to_ascii_uppercase();
            if permission == "READ" || permission == "READ_ACP" {
                push(
                    "public-read-access",
                    Severity::Critical,
                    "access-control",
                    format!("Bucket '{}' grants public read access via ACL", bucket),
                    "Remove the public ACL grant and serve objects through signed URLs",
                );
            } else if permission == "WRITE" || permission == "WRITE_ACP" || permission == "FULL_CONTROL" {
                push(
                    "public-write-access",
                    Severity::Critical,
                    "access-control",
                    format!("Bucket '{}' grants public write access via ACL", bucket),
                    "Remove the public ACL grant immediately; public write enables content tampering",
                );
            }
        }

        if let Some(policy) = &config.policy {
            if policy_allows_public_access(policy) {
                push(
                    "policy-public-access",
                    Severity::Critical,
                    "access-control",
                    format!("Bucket '{}' policy allows access to any principal", bucket),
                    "Scope the bucket policy to specific principals or accounts",
                );
            }
        }

        let block_enabled = config
            .public_access_block
            .map(|b| b.fully_enabled())
            .unwrap_or(false);
        if !block_enabled {
            push(
                "public-access-block-disabled",
                Severity::High,
                "access-control",
                format!("Bucket '{}' does not enable all public access block settings", bucket),
                "Turn on all four public access block settings at the bucket level",
            );
        }

        findings
    }
}

fn policy_allows_public_access(policy: &serde_json::Value) -> bool {
    let Some(statements) = policy["Statement"].as_array() else {
        return false;
    };
    statements.iter().any(|statement| {
        if statement["Effect"].as_str() != Some("Allow") {
            return false;
        }
        let principal = &statement["Principal"];
        principal.as_str() == Some("*") || principal["AWS"].as_str() == Some("*")
    })
}

#[async_trait]
impl ToolAdapter for CloudConfigAdapter {
    fn name(&self) -> &'static str {
        "cloud-config"
    }

    async fn run(
        &self,
        input: &ScanInput,
        _options: &RunOptions,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        let ScanInput::Bucket { name } = input else {
            return Ok(Vec::new());
        };
        let config = self.api.bucket_config(name).await?;
        let findings = Self::audit(name, &config);
        debug!(bucket = %name, count = findings.len(), "configuration audit complete");
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hardened_config() -> BucketConfig {
        BucketConfig {
            encryption_enabled: true,
            versioning_enabled: true,
            logging_enabled: true,
            acl_grants: vec![],
            policy: None,
            public_access_block: Some(PublicAccessBlock {
                block_public_acls: true,
                ignore_public_acls: true,
                block_public_policy: true,
                restrict_public_buckets: true,
            }),
        }
    }

    fn checks(findings: &[RawFinding]) -> Vec<&'static str> {
        findings
            .iter()
            .map(|f| match f {
                RawFinding::CloudConfig(c) => c.check,
                other => panic!("unexpected raw finding: {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_hardened_bucket_is_clean() {
        let findings = CloudConfigAdapter::audit("prod-assets", &hardened_config());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_missing_encryption_is_high() {
        let mut config = hardened_config();
        config.encryption_enabled = false;
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert_eq!(checks(&findings), vec!["encryption-disabled"]);
        let RawFinding::CloudConfig(c) = &findings[0] else {
            unreachable!()
        };
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.category, "encryption");
    }

    #[test]
    fn test_public_read_acl_is_critical() {
        let mut config = hardened_config();
        config.acl_grants = vec![AclGrant {
            grantee_uri: Some("http://acs.amazonaws.com/groups/global/AllUsers".to_string()),
            permission: "READ".to_string(),
        }];
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert_eq!(checks(&findings), vec!["public-read-access"]);
        let RawFinding::CloudConfig(c) = &findings[0] else {
            unreachable!()
        };
        assert_eq!(c.severity, Severity::Critical);
    }

    #[test]
    fn test_scoped_acl_grant_is_not_flagged() {
        let mut config = hardened_config();
        config.acl_grants = vec![AclGrant {
            grantee_uri: None,
            permission: "FULL_CONTROL".to_string(),
        }];
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_wildcard_policy_principal() {
        let mut config = hardened_config();
        config.policy = Some(json!({
            "Statement": [
                {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}
            ]
        }));
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert_eq!(checks(&findings), vec!["policy-public-access"]);
    }

    #[test]
    fn test_deny_statement_with_wildcard_is_fine() {
        let mut config = hardened_config();
        config.policy = Some(json!({
            "Statement": [
                {"Effect": "Deny", "Principal": "*", "Action": "s3:*"}
            ]
        }));
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_partial_public_access_block() {
        let mut config = hardened_config();
        config.public_access_block = Some(PublicAccessBlock {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: false,
            restrict_public_buckets: true,
        });
        let findings = CloudConfigAdapter::audit("prod-assets", &config);
        assert_eq!(checks(&findings), vec!["public-access-block-disabled"]);
    }

    #[test]
    fn test_default_config_flags_everything_relevant() {
        let findings = CloudConfigAdapter::audit("prod-assets", &BucketConfig::default());
        let found = checks(&findings);
        assert!(found.contains(&"encryption-disabled"));
        assert!(found.contains(&"versioning-disabled"));
        assert!(found.contains(&"access-logging-disabled"));
        assert!(found.contains(&"public-access-block-disabled"));
    }
}
