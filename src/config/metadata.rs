//! Deployment metadata resolved from the CI environment
//!
//! Resolved once at startup and passed explicitly to the dispatcher.
//! Repository and commit always have a value (real or generated); the git
//! reference is simply absent when the environment does not provide one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defaults::{
    fallback_commit_sha, fallback_repository, host_identifier, ENV_REF, ENV_REPOSITORY, ENV_SHA,
};

/// Where a metadata value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Environment,
    Fallback,
}

/// Repository, commit and ref attached to an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    /// Repository name (`owner/repo`)
    pub repository: String,

    /// Commit identifier
    pub commit_sha: String,

    /// Git reference, as given by the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Origin of `repository`
    pub repository_source: MetadataSource,

    /// Origin of `commit_sha`
    pub commit_sha_source: MetadataSource,
}

impl DeploymentMetadata {
    /// Resolve from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), Utc::now())
    }

    /// Resolve from an arbitrary variable lookup. Empty values count as
    /// absent.
    pub fn from_lookup<F>(lookup: F, now: DateTime<Utc>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let (repository, repository_source) = match get(ENV_REPOSITORY) {
            Some(repo) => (repo, MetadataSource::Environment),
            None => (
                fallback_repository(&host_identifier(&lookup)),
                MetadataSource::Fallback,
            ),
        };

        let (commit_sha, commit_sha_source) = match get(ENV_SHA) {
            Some(sha) => (sha, MetadataSource::Environment),
            None => (fallback_commit_sha(now), MetadataSource::Fallback),
        };

        Self {
            repository,
            commit_sha,
            git_ref: get(ENV_REF),
            repository_source,
            commit_sha_source,
        }
    }

    /// Branch name for transmission: the ref with any `refs/heads/` prefix
    /// removed. Other refs (tags, pull requests) pass through unchanged.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_all_values_from_environment() {
        let meta = DeploymentMetadata::from_lookup(
            lookup_from(&[
                ("GITHUB_REPOSITORY", "acme/site"),
                ("GITHUB_SHA", "0123abcd"),
                ("GITHUB_REF", "refs/heads/main"),
            ]),
            fixed_now(),
        );

        assert_eq!(meta.repository, "acme/site");
        assert_eq!(meta.commit_sha, "0123abcd");
        assert_eq!(meta.git_ref.as_deref(), Some("refs/heads/main"));
        assert_eq!(meta.branch(), Some("main"));
        assert_eq!(meta.repository_source, MetadataSource::Environment);
        assert_eq!(meta.commit_sha_source, MetadataSource::Environment);
    }

    #[test]
    fn test_fallbacks_when_absent() {
        let meta = DeploymentMetadata::from_lookup(
            lookup_from(&[("HOSTNAME", "ci-box")]),
            fixed_now(),
        );

        assert_eq!(meta.repository, "unknown-ci-box");
        assert_eq!(meta.commit_sha, "local-20250102030405");
        assert_eq!(meta.git_ref, None);
        assert_eq!(meta.branch(), None);
        assert_eq!(meta.repository_source, MetadataSource::Fallback);
        assert_eq!(meta.commit_sha_source, MetadataSource::Fallback);
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let meta = DeploymentMetadata::from_lookup(
            lookup_from(&[
                ("GITHUB_REPOSITORY", ""),
                ("GITHUB_SHA", ""),
                ("GITHUB_REF", ""),
                ("HOSTNAME", "h"),
            ]),
            fixed_now(),
        );

        assert_eq!(meta.repository, "unknown-h");
        assert!(meta.commit_sha.starts_with("local-"));
        assert_eq!(meta.git_ref, None);
    }

    #[test]
    fn test_branch_only_strips_heads_prefix() {
        let tag = DeploymentMetadata::from_lookup(
            lookup_from(&[("GITHUB_REF", "refs/tags/v1.0")]),
            fixed_now(),
        );
        assert_eq!(tag.branch(), Some("refs/tags/v1.0"));

        let nested = DeploymentMetadata::from_lookup(
            lookup_from(&[("GITHUB_REF", "refs/heads/feature/refs/heads/x")]),
            fixed_now(),
        );
        assert_eq!(nested.branch(), Some("feature/refs/heads/x"));
    }

    #[test]
    fn test_serializes_without_absent_ref() {
        let meta = DeploymentMetadata::from_lookup(
            lookup_from(&[("GITHUB_REPOSITORY", "a/b"), ("GITHUB_SHA", "c")]),
            fixed_now(),
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["repository"], "a/b");
        assert_eq!(json["repository_source"], "environment");
        assert!(json.get("git_ref").is_none());
    }
}
