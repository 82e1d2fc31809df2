//! The `DKIM-Signature` header: rendering and transport extraction.
//!
//! Rendering folds the header the way mail signers do, with CRLF followed by
//! a space, and always starts `b=` on its own continuation line so that
//! inserting the signature never moves earlier line breaks.

use crate::canonicalize::Canonicalization;
use crate::error::{SigningError, SigningResult};
use crate::key::SigningAlgorithm;
use crate::tag_list::TagList;

/// Header field name of the signature.
pub const DKIM_SIGNATURE_HEADER: &str = "DKIM-Signature";

/// Tags a signature must carry to be usable by a verifier.
pub const REQUIRED_TAGS: &[&str] = &["v", "a", "b", "bh", "d", "h", "s"];

/// Preferred maximum line length, excluding CRLF (RFC 5322 §2.1.1).
const MAX_LINE_LEN: usize = 78;

/// Width of each folded chunk of the `b=` value.
const SIGNATURE_CHUNK_LEN: usize = 72;

/// Tag values of one signature, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimSignature {
    pub algorithm: SigningAlgorithm,
    pub canonicalization: Canonicalization,
    pub domain: String,
    pub selector: String,
    /// `t=`, seconds since the UNIX epoch
    pub timestamp: Option<i64>,
    /// `h=`, lower-cased field names
    pub signed_headers: Vec<String>,
    /// `bh=`, base64
    pub body_hash: String,
    /// `b=`, base64; empty while computing the data to sign
    pub signature: String,
}

impl DkimSignature {
    /// Every tag except `b`, as `(name, value)` pairs.
    fn leading_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("v", "1".to_string()),
            ("a", self.algorithm.to_string()),
            ("c", self.canonicalization.tag_value()),
            ("d", self.domain.clone()),
            ("q", "dns/txt".to_string()),
            ("s", self.selector.clone()),
        ];
        if let Some(t) = self.timestamp {
            tags.push(("t", t.to_string()));
        }
        tags.push(("h", self.signed_headers.join(":")));
        tags.push(("bh", self.body_hash.clone()));
        tags
    }

    /// Folded field value, i.e. everything after `DKIM-Signature:`.
    pub fn header_value(&self) -> String {
        let mut out = String::new();
        let mut line_len = DKIM_SIGNATURE_HEADER.len() + 1;

        for (name, value) in self.leading_tags() {
            let piece = format!("{}={};", name, value);
            if line_len + 1 + piece.len() > MAX_LINE_LEN && !out.is_empty() {
                out.push_str("\r\n ");
                line_len = 1;
            } else {
                out.push(' ');
                line_len += 1;
            }
            out.push_str(&piece);
            line_len += piece.len();
        }

        out.push_str("\r\n b=");
        let bytes = self.signature.as_bytes();
        for (i, chunk) in bytes.chunks(SIGNATURE_CHUNK_LEN).enumerate() {
            if i > 0 {
                out.push_str("\r\n ");
            }
            // base64 output is ASCII, so chunk boundaries are char boundaries
            out.push_str(&String::from_utf8_lossy(chunk));
        }

        out
    }

    /// Complete folded header line, without a trailing CRLF.
    pub fn to_header_line(&self) -> String {
        format!("{}:{}", DKIM_SIGNATURE_HEADER, self.header_value())
    }
}

/// Turn a `DKIM-Signature: ...` header line into a single-line value.
///
/// The field name must be `DKIM-Signature` (any case). Folding line breaks
/// are removed, keeping the whitespace that follows them; a line break not
/// followed by whitespace is an error. The result is validated as a tag list
/// carrying every tag in [`REQUIRED_TAGS`].
pub fn extract_header_value(line: &str) -> SigningResult<String> {
    let Some((name, raw_value)) = line.split_once(':') else {
        return Err(SigningError::MalformedSignature(
            "no field name separator".to_string(),
        ));
    };

    let name = name.trim_end_matches(|c: char| c == ' ' || c == '\t');
    if !name.eq_ignore_ascii_case(DKIM_SIGNATURE_HEADER) {
        return Err(SigningError::MalformedSignature(format!(
            "unexpected field name: {:?}",
            name
        )));
    }

    let value = unfold(raw_value)?;
    let value = value.trim_matches(|c: char| c == ' ' || c == '\t').to_string();

    let tags = TagList::parse(&value)?;
    for required in REQUIRED_TAGS {
        if !tags.contains(required) {
            return Err(SigningError::MalformedSignature(format!(
                "missing required tag: {}",
                required
            )));
        }
    }
    if tags.get("v") != Some("1") {
        return Err(SigningError::MalformedSignature(
            "unsupported version tag".to_string(),
        ));
    }

    Ok(value)
}

/// Remove folding line breaks (CRLF or bare LF followed by WSP) and a
/// terminating line break at the very end.
fn unfold(value: &str) -> SigningResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.next() != Some('\n') {
                    return Err(SigningError::MalformedSignature(
                        "bare carriage return".to_string(),
                    ));
                }
                check_fold(chars.peek().copied())?;
            }
            '\n' => check_fold(chars.peek().copied())?,
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn check_fold(next: Option<char>) -> SigningResult<()> {
    match next {
        None | Some(' ') | Some('\t') => Ok(()),
        Some(_) => Err(SigningError::MalformedSignature(
            "line break not followed by whitespace".to_string(),
        )),
    }
}
