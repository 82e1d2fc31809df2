//! Minimal mail-style message around an artifact.
//!
//! The signable message is a single synthetic `From` header, a blank line,
//! and the artifact bytes as the body. Parsing follows the RFC 5322 line
//! model: header lines end at the first empty line, continuation lines start
//! with whitespace, and bare LF counts as a line ending.

use crate::error::{SigningError, SigningResult};

/// A header field as it appeared in the message, with folding preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Field name, case preserved
    pub name: String,
    /// Raw value after the colon, continuation lines joined with CRLF
    pub value: String,
}

/// The synthetic message signed on behalf of an artifact.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    from: &'a str,
    body: &'a [u8],
}

impl<'a> Message<'a> {
    pub fn new(from: &'a str, body: &'a [u8]) -> Self {
        Self { from, body }
    }

    /// `"From: " + from + "\n\n"` followed by the body, unmodified.
    pub fn to_bytes(&self) -> Vec<u8> {
        let preamble = format!("From: {}\n\n", self.from);
        let mut out = Vec::with_capacity(preamble.len() + self.body.len());
        out.extend_from_slice(preamble.as_bytes());
        out.extend_from_slice(self.body);
        out
    }
}

/// Header section and CRLF-normalized body of a raw message.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub headers: Vec<HeaderField>,
    pub body: Vec<u8>,
}

/// Split a raw message into header fields and body.
pub fn parse_message(raw: &[u8]) -> SigningResult<ParsedMessage> {
    let mut headers: Vec<HeaderField> = Vec::new();
    let mut pos = 0;

    while pos < raw.len() {
        let (line, next) = next_line(raw, pos);
        pos = next;

        if line.is_empty() {
            return Ok(ParsedMessage {
                headers,
                body: normalize_line_endings(&raw[pos..]),
            });
        }

        let text = std::str::from_utf8(line)
            .map_err(|_| SigningError::MalformedMessage("header is not valid UTF-8".to_string()))?;

        if text.starts_with(&[' ', '\t'][..]) {
            let Some(last) = headers.last_mut() else {
                return Err(SigningError::MalformedMessage(
                    "continuation line before first header".to_string(),
                ));
            };
            last.value.push_str("\r\n");
            last.value.push_str(text);
            continue;
        }

        let Some((name, value)) = text.split_once(':') else {
            return Err(SigningError::MalformedMessage(format!(
                "header line without colon: {}",
                text
            )));
        };
        if name.is_empty() || !name.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            return Err(SigningError::MalformedMessage(format!(
                "invalid header field name: {:?}",
                name
            )));
        }

        headers.push(HeaderField {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    Ok(ParsedMessage {
        headers,
        body: Vec::new(),
    })
}

/// Return the line starting at `start` without its terminator, and the
/// offset just past the terminator.
fn next_line(raw: &[u8], start: usize) -> (&[u8], usize) {
    match raw[start..].iter().position(|&b| b == b'\n') {
        Some(i) => {
            let end = start + i;
            let line = &raw[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            (line, end + 1)
        }
        None => (&raw[start..], raw.len()),
    }
}

/// Rewrite bare LF as CRLF; existing CRLF pairs are left alone.
pub(crate) fn normalize_line_endings(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 32);
    let mut prev = 0u8;
    for &b in bytes {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}
