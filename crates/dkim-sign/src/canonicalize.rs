//! Header and body canonicalization (RFC 6376 §3.4).
//!
//! Bodies are expected in CRLF line form; see
//! [`parse_message`](crate::message::parse_message).

use std::fmt;

/// A canonicalization algorithm, applied to headers or body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationMode {
    Simple,
    #[default]
    Relaxed,
}

impl CanonicalizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for CanonicalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header and body canonicalization pair, rendered as the `c=` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Canonicalization {
    pub header: CanonicalizationMode,
    pub body: CanonicalizationMode,
}

impl Canonicalization {
    pub fn relaxed() -> Self {
        Self {
            header: CanonicalizationMode::Relaxed,
            body: CanonicalizationMode::Relaxed,
        }
    }

    pub fn simple() -> Self {
        Self {
            header: CanonicalizationMode::Simple,
            body: CanonicalizationMode::Simple,
        }
    }

    /// Value of the `c=` tag, e.g. `relaxed/relaxed`.
    pub fn tag_value(&self) -> String {
        format!("{}/{}", self.header, self.body)
    }
}

fn is_wsp(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Canonicalize one header field. `value` is everything after the colon,
/// including any folding. The result ends in CRLF.
pub fn canonicalize_header(mode: CanonicalizationMode, name: &str, value: &str) -> String {
    match mode {
        CanonicalizationMode::Simple => format!("{}:{}\r\n", name, value),
        CanonicalizationMode::Relaxed => {
            let mut out = name.trim_end_matches(|c: char| c == ' ' || c == '\t').to_ascii_lowercase();
            out.push(':');
            out.push_str(&relaxed_header_value(value));
            out.push_str("\r\n");
            out
        }
    }
}

/// Unfold, collapse whitespace runs to one space, and trim both ends.
fn relaxed_header_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;

    for c in value.chars() {
        match c {
            '\r' | '\n' => {}
            ' ' | '\t' => pending_space = true,
            _ => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }

    out
}

/// Canonicalize a CRLF-form body.
pub fn canonicalize_body(mode: CanonicalizationMode, body: &[u8]) -> Vec<u8> {
    match mode {
        CanonicalizationMode::Simple => simple_body(body),
        CanonicalizationMode::Relaxed => relaxed_body(body),
    }
}

fn simple_body(body: &[u8]) -> Vec<u8> {
    let mut end = body.len();
    while end >= 2 && &body[end - 2..end] == b"\r\n" {
        end -= 2;
    }

    let mut out = body[..end].to_vec();
    out.extend_from_slice(b"\r\n");
    out
}

fn relaxed_body(body: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = split_crlf(body)
        .map(|line| {
            let mut out = Vec::with_capacity(line.len());
            let mut pending_space = false;
            for &b in line {
                if is_wsp(b) {
                    pending_space = true;
                } else {
                    if pending_space {
                        out.push(b' ');
                    }
                    pending_space = false;
                    out.push(b);
                }
            }
            // trailing whitespace is dropped by never flushing pending_space
            out
        })
        .collect();

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let mut out = Vec::with_capacity(body.len());
    for line in lines {
        out.extend_from_slice(&line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Split on CRLF. A body ending in CRLF yields a final empty line.
fn split_crlf(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(body);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.windows(2).position(|w| w == b"\r\n") {
            Some(i) => {
                rest = Some(&current[i + 2..]);
                Some(&current[..i])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}
