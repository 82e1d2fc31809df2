//! DKIM signer (RFC 6376 §5).
//!
//! Signing a message:
//! 1. Split it into header fields and a CRLF body
//! 2. Hash the canonical body into `bh=`
//! 3. Canonicalize the selected headers, bottom-up, followed by the
//!    `DKIM-Signature` header with an empty `b=` and no trailing CRLF
//! 4. Sign that data with the private key and fill in `b=`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonicalize::{canonicalize_body, canonicalize_header, Canonicalization};
use crate::error::SigningResult;
use crate::identity::SigningIdentity;
use crate::key::PrivateKey;
use crate::message::{parse_message, HeaderField, Message};
use crate::signature::{extract_header_value, DkimSignature, DKIM_SIGNATURE_HEADER};

/// Header fields covered by default.
pub const DEFAULT_SIGNED_HEADERS: &[&str] = &["From"];

/// Signs messages for one identity with one key.
#[derive(Debug)]
pub struct Signer {
    identity: SigningIdentity,
    key: PrivateKey,
    canonicalization: Canonicalization,
    signed_headers: Vec<String>,
    timestamp: Option<i64>,
}

impl Signer {
    /// Relaxed/relaxed canonicalization, `From` only, current time as `t=`.
    pub fn new(identity: SigningIdentity, key: PrivateKey) -> Self {
        Self {
            identity,
            key,
            canonicalization: Canonicalization::relaxed(),
            signed_headers: DEFAULT_SIGNED_HEADERS.iter().map(|h| h.to_string()).collect(),
            timestamp: None,
        }
    }

    pub fn with_canonicalization(mut self, canonicalization: Canonicalization) -> Self {
        self.canonicalization = canonicalization;
        self
    }

    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Fix the `t=` tag instead of reading the clock.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sign a raw message and return the folded `DKIM-Signature: ...` line.
    pub fn sign_message(&self, raw: &[u8]) -> SigningResult<String> {
        let parsed = parse_message(raw)?;

        let body = canonicalize_body(self.canonicalization.body, &parsed.body);
        let body_hash = STANDARD.encode(Sha256::digest(&body));

        let mut signature = DkimSignature {
            algorithm: self.key.algorithm(),
            canonicalization: self.canonicalization,
            domain: self.identity.domain().to_string(),
            selector: self.identity.selector().to_string(),
            timestamp: Some(self.timestamp.unwrap_or_else(|| Utc::now().timestamp())),
            signed_headers: self
                .signed_headers
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            body_hash,
            signature: String::new(),
        };

        let mut data = self.canonical_headers(&parsed.headers);
        let template = canonicalize_header(
            self.canonicalization.header,
            DKIM_SIGNATURE_HEADER,
            &signature.header_value(),
        );
        data.push_str(template.trim_end_matches("\r\n"));

        let raw_signature = self.key.sign(data.as_bytes())?;
        signature.signature = STANDARD.encode(raw_signature);

        debug!(
            domain = %signature.domain,
            selector = %signature.selector,
            algorithm = %signature.algorithm,
            body_hash = %signature.body_hash,
            "signed message"
        );

        Ok(signature.to_header_line())
    }

    /// Sign an artifact wrapped in a synthetic `From` message and return the
    /// single-line header value for transport.
    pub fn sign_artifact(&self, from: &str, artifact: &[u8]) -> SigningResult<String> {
        let raw = Message::new(from, artifact).to_bytes();
        let line = self.sign_message(&raw)?;
        extract_header_value(&line)
    }

    /// Canonical form of the signed header fields. Each name in `h=` takes
    /// the last not-yet-used occurrence; absent fields contribute nothing.
    fn canonical_headers(&self, headers: &[HeaderField]) -> String {
        let mut used = vec![false; headers.len()];
        let mut out = String::new();

        for name in &self.signed_headers {
            let found = headers
                .iter()
                .enumerate()
                .rev()
                .find(|(i, h)| !used[*i] && h.name.eq_ignore_ascii_case(name));
            if let Some((i, field)) = found {
                used[i] = true;
                out.push_str(&canonicalize_header(
                    self.canonicalization.header,
                    &field.name,
                    &field.value,
                ));
            }
        }

        out
    }
}

/// Sign `artifact` as `from` with a PEM key, using relaxed/relaxed
/// canonicalization over the `From` header.
pub fn sign_artifact(
    identity: &SigningIdentity,
    artifact: &[u8],
    from: &str,
    private_key_pem: &[u8],
) -> SigningResult<String> {
    let key = PrivateKey::from_pem(private_key_pem)?;
    Signer::new(identity.clone(), key).sign_artifact(from, artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::CanonicalizationMode;
    use crate::error::SigningError;
    use crate::tag_list::TagList;
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::Pkcs1v15Sign;

    const RSA_PKCS1: &str = include_str!("../tests/fixtures/rsa2048_pkcs1.pem");
    const ED25519_PKCS8: &str = include_str!("../tests/fixtures/ed25519.pem");

    fn rsa_signer() -> Signer {
        let identity = SigningIdentity::resolve("deploy@example.com").unwrap();
        let key = PrivateKey::from_pem(RSA_PKCS1.as_bytes()).unwrap();
        Signer::new(identity, key).with_timestamp(1_700_000_000)
    }

    /// Rebuild the signed data from a transport value the way a relaxed
    /// verifier does, and check `b=` against the public key.
    fn verify_rsa(value: &str, from: &str) {
        let tags = TagList::parse(value).unwrap();
        let b: String = tags
            .get("b")
            .unwrap()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let sig = STANDARD.decode(b).unwrap();

        // b= is always the last tag
        let b_start = value.find("; b=").unwrap() + 2;
        let without_b = format!("{}b=", &value[..b_start]);

        let mut data = canonicalize_header(CanonicalizationMode::Relaxed, "From", &format!(" {}", from));
        data.push_str(
            canonicalize_header(CanonicalizationMode::Relaxed, DKIM_SIGNATURE_HEADER, &without_b)
                .trim_end_matches("\r\n"),
        );

        let key = rsa::RsaPrivateKey::from_pkcs1_pem(RSA_PKCS1).unwrap();
        let digest = Sha256::digest(data.as_bytes());
        key.to_public_key()
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &sig)
            .unwrap();
    }

    #[test]
    fn test_scenario_sign_hello() {
        let identity = SigningIdentity::resolve("deploy@example.com").unwrap();
        let value = sign_artifact(
            &identity,
            b"hello",
            "deploy@example.com",
            RSA_PKCS1.as_bytes(),
        )
        .unwrap();

        assert!(value.starts_with("v=1;"));
        assert!(!value.contains('\r') && !value.contains('\n'));

        let tags = TagList::parse(&value).unwrap();
        assert_eq!(tags.get("d"), Some("example.com"));
        assert_eq!(tags.get("s"), Some("deploy"));
        assert_eq!(tags.get("a"), Some("rsa-sha256"));
        assert_eq!(tags.get("c"), Some("relaxed/relaxed"));
        assert_eq!(tags.get("h"), Some("from"));
    }

    #[test]
    fn test_body_hash_of_hello() {
        let value = rsa_signer().sign_artifact("deploy@example.com", b"hello").unwrap();
        let tags = TagList::parse(&value).unwrap();
        // SHA-256 of "hello\r\n"
        assert_eq!(
            tags.get("bh"),
            Some("zS7KNTV0HyeorkDDGwxB1AV6enuRKzO5rthkhdHIRnY=")
        );
    }

    #[test]
    fn test_body_hash_of_empty_artifact() {
        let value = rsa_signer().sign_artifact("deploy@example.com", b"").unwrap();
        let tags = TagList::parse(&value).unwrap();
        // SHA-256 of the empty string
        assert_eq!(
            tags.get("bh"),
            Some("47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=")
        );
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let value = rsa_signer()
            .sign_artifact("deploy@example.com", b"binary\x00payload\n  with  spaces  \n\n")
            .unwrap();
        verify_rsa(&value, "deploy@example.com");
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = rsa_signer();
        let first = signer.sign_artifact("deploy@example.com", b"artifact").unwrap();
        let second = signer.sign_artifact("deploy@example.com", b"artifact").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_signature_tags_stable_across_clock() {
        let identity = SigningIdentity::resolve("deploy@example.com").unwrap();
        let first = sign_artifact(&identity, b"x", "deploy@example.com", RSA_PKCS1.as_bytes()).unwrap();
        let second = sign_artifact(&identity, b"x", "deploy@example.com", RSA_PKCS1.as_bytes()).unwrap();

        let first = TagList::parse(&first).unwrap();
        let second = TagList::parse(&second).unwrap();
        for tag in ["v", "a", "d", "s", "h", "bh"] {
            assert_eq!(first.get(tag), second.get(tag), "tag {} differs", tag);
        }
    }

    #[test]
    fn test_body_whitespace_changes_do_not_change_body_hash() {
        let signer = rsa_signer();
        let a = signer.sign_artifact("deploy@example.com", b"line  one\nline two\n").unwrap();
        let b = signer.sign_artifact("deploy@example.com", b"line one \r\nline\ttwo\r\n\r\n").unwrap();
        assert_eq!(
            TagList::parse(&a).unwrap().get("bh"),
            TagList::parse(&b).unwrap().get("bh")
        );
    }

    #[test]
    fn test_different_artifacts_differ_in_body_hash() {
        let signer = rsa_signer();
        let a = signer.sign_artifact("deploy@example.com", b"one").unwrap();
        let b = signer.sign_artifact("deploy@example.com", b"two").unwrap();
        assert_ne!(
            TagList::parse(&a).unwrap().get("bh"),
            TagList::parse(&b).unwrap().get("bh")
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_ed25519_signing() {
        let identity = SigningIdentity::resolve("ed@example.org").unwrap();
        let value = sign_artifact(
            &identity,
            b"hello",
            "ed@example.org",
            ED25519_PKCS8.as_bytes(),
        )
        .unwrap();
        let tags = TagList::parse(&value).unwrap();
        assert_eq!(tags.get("a"), Some("ed25519-sha256"));

        let b: String = tags.get("b").unwrap().split_whitespace().collect();
        assert_eq!(STANDARD.decode(b).unwrap().len(), 64);
    }

    #[test]
    fn test_header_line_is_folded() {
        let line = rsa_signer()
            .sign_message(b"From: deploy@example.com\n\nhello")
            .unwrap();
        assert!(line.starts_with("DKIM-Signature: v=1;"));
        assert!(line.contains("\r\n b="));
    }

    #[test]
    fn test_extra_signed_header_absent_from_message() {
        let signer = rsa_signer().with_headers(["From", "Subject"]);
        let value = signer.sign_artifact("deploy@example.com", b"hello").unwrap();
        assert_eq!(TagList::parse(&value).unwrap().get("h"), Some("from:subject"));
    }

    #[test]
    fn test_simple_canonicalization_tag() {
        let signer = rsa_signer().with_canonicalization(Canonicalization::simple());
        let value = signer.sign_artifact("deploy@example.com", b"hello").unwrap();
        let tags = TagList::parse(&value).unwrap();
        assert_eq!(tags.get("c"), Some("simple/simple"));
        // SHA-256 of "hello\r\n"; simple and relaxed agree here
        assert_eq!(
            tags.get("bh"),
            Some("zS7KNTV0HyeorkDDGwxB1AV6enuRKzO5rthkhdHIRnY=")
        );
    }

    #[test]
    fn test_invalid_key_surfaces_error() {
        let identity = SigningIdentity::resolve("deploy@example.com").unwrap();
        let result = sign_artifact(&identity, b"hello", "deploy@example.com", b"garbage");
        assert!(matches!(result, Err(SigningError::InvalidKey(_))));
    }
}
