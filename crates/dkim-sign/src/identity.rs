//! Signing identity resolution.
//!
//! A signing address `local@domain` names both the DKIM selector (the local
//! part) and the signing domain. Verifiers look the public key up at
//! `selector._domainkey.domain`.

use std::fmt;

use crate::error::IdentityError;

/// Selector and domain derived from a signing address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    selector: String,
    domain: String,
}

impl SigningIdentity {
    /// Split `address` on its single `@`.
    ///
    /// Both halves must be dot-separated DNS labels (ASCII letters, digits,
    /// `-` and `_`). They become the `s=`/`d=` tags and the key record name.
    pub fn resolve(address: &str) -> Result<Self, IdentityError> {
        let mut parts = address.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(IdentityError::InvalidIdentityFormat(address.to_string()));
        };

        if !is_dns_name(local) || !is_dns_name(domain) {
            return Err(IdentityError::InvalidIdentityFormat(address.to_string()));
        }

        Ok(Self {
            selector: local.to_string(),
            domain: domain.to_string(),
        })
    }

    /// The `s=` tag value.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The `d=` tag value.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// DNS name where the matching public key record is published.
    pub fn dns_record_name(&self) -> String {
        format!("{}._domainkey.{}", self.selector, self.domain)
    }
}

fn is_dns_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|label| {
            !label.is_empty()
                && label
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

impl fmt::Display for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.selector, self.domain)
    }
}

/// Resolve a signing address. See [`SigningIdentity::resolve`].
pub fn resolve(address: &str) -> Result<SigningIdentity, IdentityError> {
    SigningIdentity::resolve(address)
}
