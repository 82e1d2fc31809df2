//! Tag-value list parsing (RFC 6376 §3.2).
//!
//! `tag=value; tag=value[;]`, with folding whitespace allowed around names,
//! `=` and `;`. Values keep their inner whitespace.

use crate::error::{SigningError, SigningResult};

/// An ordered list of unique tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList {
    tags: Vec<(String, String)>,
}

fn is_fws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// VALCHAR is %x21-3A / %x3C-7E; whitespace may separate runs of them.
fn is_valid_value(value: &str) -> bool {
    value
        .chars()
        .all(|c| is_fws(c) || (('\x21'..='\x7e').contains(&c) && c != ';'))
}

impl TagList {
    pub fn parse(input: &str) -> SigningResult<Self> {
        let segments: Vec<&str> = input.split(';').collect();
        let last = segments.len() - 1;
        let mut tags: Vec<(String, String)> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            let tag_spec = segment.trim_matches(is_fws);
            if tag_spec.is_empty() {
                if i == last && i > 0 {
                    break;
                }
                return Err(SigningError::MalformedSignature(
                    "empty tag specification".to_string(),
                ));
            }

            let Some((name, value)) = tag_spec.split_once('=') else {
                return Err(SigningError::MalformedSignature(format!(
                    "tag without '=': {}",
                    tag_spec
                )));
            };
            let name = name.trim_matches(is_fws);
            let value = value.trim_matches(is_fws);

            if !is_valid_name(name) {
                return Err(SigningError::MalformedSignature(format!(
                    "invalid tag name: {:?}",
                    name
                )));
            }
            if !is_valid_value(value) {
                return Err(SigningError::MalformedSignature(format!(
                    "invalid value for tag {}",
                    name
                )));
            }
            if tags.iter().any(|(existing, _)| existing == name) {
                return Err(SigningError::MalformedSignature(format!(
                    "duplicate tag: {}",
                    name
                )));
            }

            tags.push((name.to_string(), value.to_string()));
        }

        Ok(Self { tags })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
