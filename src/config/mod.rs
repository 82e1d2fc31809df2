//! Run configuration
//!
//! Two inputs make up a run:
//! 1. `DeployConfig`: what to upload, where, and as whom (command line)
//! 2. `DeploymentMetadata`: repository/commit/ref from the CI environment

mod defaults;
mod metadata;

pub use defaults::{
    fallback_commit_sha, fallback_repository, host_identifier, DEFAULT_PRIVATE_KEY_PATH,
    ENV_REF, ENV_REPOSITORY, ENV_SHA, FALLBACK_REPOSITORY_PREFIX, FALLBACK_SHA_PREFIX,
};
pub use metadata::{DeploymentMetadata, MetadataSource};

use std::path::{Path, PathBuf};

/// Inputs for one signed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Target server URL
    pub server: String,

    /// Artifact to upload
    pub file_to_deploy: PathBuf,

    /// Signing address (`selector@domain`), also sent as `From`
    pub signing_address: String,

    /// PEM private key
    pub private_key_path: PathBuf,
}

impl DeployConfig {
    /// Config with the default private key path
    pub fn new(
        server: impl Into<String>,
        file_to_deploy: impl Into<PathBuf>,
        signing_address: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            file_to_deploy: file_to_deploy.into(),
            signing_address: signing_address.into(),
            private_key_path: PathBuf::from(DEFAULT_PRIVATE_KEY_PATH),
        }
    }

    pub fn with_private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = path.into();
        self
    }

    /// Base name of the artifact, as sent in `Content-Disposition`
    pub fn file_name(&self) -> String {
        file_name_of(&self.file_to_deploy)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_private_key_path() {
        let config = DeployConfig::new("https://deploy.example.com", "dist/site.tar.gz", "a@b");
        assert_eq!(config.private_key_path, PathBuf::from("gha.pem"));
    }

    #[test]
    fn test_override_private_key_path() {
        let config = DeployConfig::new("u", "f", "a@b").with_private_key_path("/keys/deploy.pem");
        assert_eq!(config.private_key_path, PathBuf::from("/keys/deploy.pem"));
    }

    #[test]
    fn test_file_name_is_base_name() {
        let config = DeployConfig::new("u", "build/out/site.tar.gz", "a@b");
        assert_eq!(config.file_name(), "site.tar.gz");

        let bare = DeployConfig::new("u", "artifact.zip", "a@b");
        assert_eq!(bare.file_name(), "artifact.zip");
    }
}
