//! Signed upload dispatch
//!
//! Builds the fixed header set for an upload, sends the raw artifact bytes
//! through a [`Transport`], and classifies the response: status codes below
//! 400 are success, anything else is a rejection.

pub mod transport;

pub use transport::{
    HttpTransport, MockTransport, Transport, TransportError, TransportResponse, UploadRequest,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DeploymentMetadata;

/// Content type of every upload
pub const CONTENT_TYPE: &str = "application/data";

/// First status code counted as failure
pub const FAILURE_STATUS_THRESHOLD: u16 = 400;

/// Header set of a signed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeaders {
    /// `From`: the signing address, verbatim
    pub from: String,

    /// `DKIM-Signature`: single-line tag list
    pub dkim_signature: String,

    /// `Content-Disposition`
    pub content_disposition: String,

    /// `X-GitHub-Repository`
    pub repository: String,

    /// `X-GitHub-SHA`
    pub commit_sha: String,

    /// `X-GitHub-Ref`, with `refs/heads/` removed; omitted when unknown
    pub git_ref: Option<String>,
}

impl UploadHeaders {
    pub fn new(
        from: &str,
        dkim_signature: &str,
        file_name: &str,
        metadata: &DeploymentMetadata,
    ) -> Self {
        Self {
            from: from.to_string(),
            dkim_signature: dkim_signature.to_string(),
            content_disposition: content_disposition(file_name),
            repository: metadata.repository.clone(),
            commit_sha: metadata.commit_sha.clone(),
            git_ref: metadata.branch().map(str::to_string),
        }
    }

    /// Header pairs in transmission order
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("From".to_string(), self.from.clone()),
            ("DKIM-Signature".to_string(), self.dkim_signature.clone()),
            ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
            (
                "Content-Disposition".to_string(),
                self.content_disposition.clone(),
            ),
            ("X-GitHub-Repository".to_string(), self.repository.clone()),
            ("X-GitHub-SHA".to_string(), self.commit_sha.clone()),
        ];
        if let Some(ref git_ref) = self.git_ref {
            pairs.push(("X-GitHub-Ref".to_string(), git_ref.clone()));
        }
        pairs
    }
}

/// `attachment; filename="<name>"` with `"` and `\` escaped
pub fn content_disposition(file_name: &str) -> String {
    let mut escaped = String::with_capacity(file_name.len());
    for c in file_name.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("attachment; filename=\"{}\"", escaped)
}

/// Outcome of an upload the server answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub status_code: u16,
    pub response_body: String,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        self.status_code < FAILURE_STATUS_THRESHOLD
    }
}

impl From<TransportResponse> for UploadResult {
    fn from(response: TransportResponse) -> Self {
        Self {
            status_code: response.status_code,
            response_body: response.body,
        }
    }
}

/// Upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("server rejected upload with status {}", .0.status_code)]
    Rejected(UploadResult),
}

/// Sends signed uploads through a transport
pub struct Dispatcher<T: Transport> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST the artifact with its signature and metadata headers
    pub fn dispatch(
        &self,
        url: &str,
        artifact: &[u8],
        file_name: &str,
        from: &str,
        signature: &str,
        metadata: &DeploymentMetadata,
    ) -> Result<UploadResult, UploadError> {
        let headers = UploadHeaders::new(from, signature, file_name, metadata);
        self.send(url, artifact, &headers)
    }

    /// POST the artifact with a prepared header set
    pub fn send(
        &self,
        url: &str,
        artifact: &[u8],
        headers: &UploadHeaders,
    ) -> Result<UploadResult, UploadError> {
        let request = UploadRequest {
            url: url.to_string(),
            headers: headers.to_pairs(),
            body: artifact.to_vec(),
        };

        debug!(headers = ?request.headers, "sending upload request");
        info!(url, bytes = artifact.len(), "uploading artifact");

        let result = UploadResult::from(self.transport.post(request)?);

        if result.is_success() {
            info!(status = result.status_code, "upload accepted");
            Ok(result)
        } else {
            warn!(status = result.status_code, "upload rejected");
            Err(UploadError::Rejected(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn metadata(pairs: &[(&str, &str)]) -> DeploymentMetadata {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeploymentMetadata::from_lookup(
            move |name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        )
    }

    fn full_metadata() -> DeploymentMetadata {
        metadata(&[
            ("GITHUB_REPOSITORY", "acme/site"),
            ("GITHUB_SHA", "deadbeef"),
            ("GITHUB_REF", "refs/heads/main"),
        ])
    }

    #[test]
    fn test_header_pairs_with_ref() {
        let headers = UploadHeaders::new("deploy@example.com", "v=1; b=x", "site.tar.gz", &full_metadata());
        let pairs = headers.to_pairs();
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "From",
                "DKIM-Signature",
                "Content-Type",
                "Content-Disposition",
                "X-GitHub-Repository",
                "X-GitHub-SHA",
                "X-GitHub-Ref",
            ]
        );
        assert_eq!(pairs[0].1, "deploy@example.com");
        assert_eq!(pairs[2].1, "application/data");
        assert_eq!(pairs[3].1, "attachment; filename=\"site.tar.gz\"");
        assert_eq!(pairs[6].1, "main");
    }

    #[test]
    fn test_ref_header_omitted_when_unknown() {
        let meta = metadata(&[("GITHUB_REPOSITORY", "acme/site"), ("GITHUB_SHA", "deadbeef")]);
        let pairs = UploadHeaders::new("a@b", "v=1", "f", &meta).to_pairs();

        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|(n, _)| n != "X-GitHub-Ref"));
    }

    #[test]
    fn test_content_disposition_escaping() {
        assert_eq!(
            content_disposition("we\"ird\\name.bin"),
            "attachment; filename=\"we\\\"ird\\\\name.bin\""
        );
    }

    #[test]
    fn test_dispatch_sends_raw_artifact() {
        let dispatcher = Dispatcher::new(MockTransport::responding(200, "stored"));
        let result = dispatcher
            .dispatch(
                "https://deploy.example.com/upload",
                b"hello",
                "hello.txt",
                "deploy@example.com",
                "v=1; a=rsa-sha256; b=abc",
                &full_metadata(),
            )
            .unwrap();

        assert_eq!(
            result,
            UploadResult {
                status_code: 200,
                response_body: "stored".to_string()
            }
        );

        let requests = dispatcher.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://deploy.example.com/upload");
        assert_eq!(requests[0].body, b"hello".to_vec());
        assert_eq!(requests[0].header("DKIM-Signature"), Some("v=1; a=rsa-sha256; b=abc"));
        assert_eq!(requests[0].header("X-GitHub-Ref"), Some("main"));
    }

    #[test]
    fn test_status_classification() {
        for (status, ok) in [(200, true), (201, true), (302, true), (399, true), (400, false), (404, false), (500, false)] {
            let result = UploadResult {
                status_code: status,
                response_body: String::new(),
            };
            assert_eq!(result.is_success(), ok, "status {}", status);
        }
    }

    #[test]
    fn test_dispatch_rejected_status() {
        let dispatcher = Dispatcher::new(MockTransport::responding(500, "boom"));
        let err = dispatcher
            .dispatch("u", b"x", "x", "a@b", "v=1", &full_metadata())
            .unwrap_err();

        match err {
            UploadError::Rejected(result) => {
                assert_eq!(result.status_code, 500);
                assert_eq!(result.response_body, "boom");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_transport_failure() {
        let dispatcher = Dispatcher::new(MockTransport::unreachable("refused"));
        let err = dispatcher
            .dispatch("u", b"x", "x", "a@b", "v=1", &full_metadata())
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(TransportError::ConnectionFailed(_))));
    }
}
