//! DKIM signing for deployment artifacts.
//!
//! An artifact is wrapped in a minimal mail message (a synthetic `From`
//! header and the artifact as body), signed per RFC 6376 with relaxed
//! canonicalization, and the resulting `DKIM-Signature` is flattened into a
//! single-line value that can travel as an HTTP header.
//!
//! ```no_run
//! use dkim_sign::{sign_artifact, SigningIdentity};
//!
//! let identity = SigningIdentity::resolve("deploy@example.com")?;
//! let pem = std::fs::read("gha.pem")?;
//! let value = sign_artifact(&identity, b"hello", "deploy@example.com", &pem)?;
//! assert!(value.starts_with("v=1;"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod canonicalize;
pub mod error;
pub mod identity;
pub mod key;
pub mod message;
pub mod signature;
pub mod signer;
pub mod tag_list;

pub use canonicalize::{Canonicalization, CanonicalizationMode};
pub use error::{IdentityError, SigningError, SigningResult};
pub use identity::{resolve, SigningIdentity};
pub use key::{PrivateKey, SigningAlgorithm};
pub use message::Message;
pub use signature::{extract_header_value, DkimSignature, DKIM_SIGNATURE_HEADER};
pub use signer::{sign_artifact, Signer};
pub use tag_list::TagList;
