//! Pipeline orchestration for a signed deployment
//!
//! Strictly sequential:
//! - Resolve the signing identity from the signing address
//! - Check that the private key and the artifact exist
//! - Read both and sign the artifact
//! - Dispatch the upload and classify the response
//!
//! Every failure is terminal. Nothing is sent unless signing succeeded.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dkim_sign::{sign_artifact, IdentityError, SigningError, SigningIdentity};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DeployConfig, DeploymentMetadata};
use crate::upload::{Dispatcher, Transport, UploadError, UploadResult};

/// Process exit status for every failed run
pub const EXIT_FAILURE: i32 = 1;

/// Which input file a check refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PrivateKey,
    Artifact,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey => write!(f, "private key file"),
            Self::Artifact => write!(f, "file"),
        }
    }
}

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    InvalidIdentityFormat(#[from] IdentityError),

    #[error("{kind} not found: {}", path.display())]
    MissingFile { kind: FileKind, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("signing failed: {0}")]
    SigningFailed(#[from] SigningError),

    #[error("upload failed: {0}")]
    UploadFailed(#[from] UploadError),
}

impl DeployError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::InvalidIdentityFormat(_) => EXIT_FAILURE,
            DeployError::MissingFile { .. } => EXIT_FAILURE,
            DeployError::ArtifactUnreadable { .. } => EXIT_FAILURE,
            DeployError::SigningFailed(_) => EXIT_FAILURE,
            DeployError::UploadFailed(_) => EXIT_FAILURE,
        }
    }

    /// The server's answer, if the failure was a rejected upload
    pub fn upload_result(&self) -> Option<&UploadResult> {
        match self {
            DeployError::UploadFailed(UploadError::Rejected(result)) => Some(result),
            _ => None,
        }
    }
}

/// Result type for pipeline operations
pub type DeployResult<T> = Result<T, DeployError>;

fn require_file(path: &Path, kind: FileKind) -> DeployResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DeployError::MissingFile {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Sign the configured artifact and upload it
pub fn deploy<T: Transport>(
    config: &DeployConfig,
    metadata: &DeploymentMetadata,
    dispatcher: &Dispatcher<T>,
) -> DeployResult<UploadResult> {
    let identity = SigningIdentity::resolve(&config.signing_address)?;
    debug!(
        selector = identity.selector(),
        domain = identity.domain(),
        key_record = %identity.dns_record_name(),
        "resolved signing identity"
    );

    require_file(&config.private_key_path, FileKind::PrivateKey)?;
    require_file(&config.file_to_deploy, FileKind::Artifact)?;

    let pem = fs::read(&config.private_key_path).map_err(SigningError::KeyRead)?;
    let artifact =
        fs::read(&config.file_to_deploy).map_err(|source| DeployError::ArtifactUnreadable {
            path: config.file_to_deploy.clone(),
            source,
        })?;

    let signature = sign_artifact(&identity, &artifact, &config.signing_address, &pem)?;
    info!(identity = %identity, bytes = artifact.len(), "artifact signed");

    let result = dispatcher.dispatch(
        &config.server,
        &artifact,
        &config.file_name(),
        &config.signing_address,
        &signature,
        metadata,
    )?;

    Ok(result)
}
