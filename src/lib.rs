//! dkim-deploy - signed artifact upload
//!
//! Signs a deployment artifact with a DKIM key (via the `dkim-sign` crate)
//! and POSTs it to a deployment server together with the signature and
//! CI metadata headers, so the server can authenticate the upload against
//! the key published at `<selector>._domainkey.<domain>`.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod upload;

pub use config::{DeployConfig, DeploymentMetadata, MetadataSource};
pub use pipeline::{deploy, DeployError, DeployResult, FileKind};
pub use upload::{
    Dispatcher, HttpTransport, MockTransport, Transport, UploadError, UploadHeaders, UploadResult,
};
