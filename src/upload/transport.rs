//! Transport Layer for Uploads
//!
//! Abstracts the HTTP POST for testability. Provides:
//! - Transport trait: interface for sending an upload request
//! - MockTransport: in-process recorder for unit and integration tests
//! - HttpTransport: blocking reqwest client for production

use std::sync::{Arc, Mutex};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// User agent sent by the HTTP transport
pub const USER_AGENT: &str = concat!("dkim-deploy/", env!("CARGO_PKG_VERSION"));

/// A fully built upload: target, ordered headers, raw body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UploadRequest {
    /// First header value with this name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub body: String,
}

/// Transport trait for upload requests
pub trait Transport: Send + Sync {
    /// Send the request and return whatever the server answered.
    /// HTTP error statuses are not transport errors.
    fn post(&self, request: UploadRequest) -> Result<TransportResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::ConnectionTimeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Canned outcome for the mock transport
#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(TransportResponse),
    ConnectionFailed(String),
}

/// Mock transport for testing - records requests and replays one outcome
#[derive(Debug, Clone)]
pub struct MockTransport {
    outcome: MockOutcome,
    requests: Arc<Mutex<Vec<UploadRequest>>>,
}

impl MockTransport {
    /// Answer every request with this status and body
    pub fn responding(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Respond(TransportResponse {
                status_code,
                body: body.into(),
            }),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every request as if the server were unreachable
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::ConnectionFailed(reason.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::responding(200, "OK")
    }
}

impl Transport for MockTransport {
    fn post(&self, request: UploadRequest) -> Result<TransportResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.outcome {
            MockOutcome::Respond(response) => Ok(response.clone()),
            MockOutcome::ConnectionFailed(reason) => {
                Err(TransportError::ConnectionFailed(reason.clone()))
            }
        }
    }
}

/// HTTP transport for production use
///
/// Sends a single blocking POST with the client's default timeouts.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Convert ordered header pairs into a header map
    fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: UploadRequest) -> Result<TransportResponse, TransportError> {
        let headers = Self::build_headers(&request.headers)?;

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()?;

        // keep the status even when the body is cut short
        let status_code = response.status().as_u16();
        let body = response.text().unwrap_or_else(|e| {
            warn!(status = status_code, error = %e, "failed to read response body");
            String::new()
        });

        Ok(TransportResponse { status_code, body })
    }
}
