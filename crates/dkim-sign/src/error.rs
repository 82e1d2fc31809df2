//! Error types for identity resolution and signing.

use std::io;
use thiserror::Error;

/// Errors from resolving a signing address into a selector and domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The address does not split into exactly one non-empty local part and
    /// one non-empty domain part.
    #[error("invalid signing address format: {0}")]
    InvalidIdentityFormat(String),
}

/// Errors from key loading, message parsing, and signature generation.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to read private key: {0}")]
    KeyRead(#[from] io::Error),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("malformed signature header: {0}")]
    MalformedSignature(String),
}

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;
