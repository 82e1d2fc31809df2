//! Built-in defaults and fallback value generation
//!
//! Fallbacks are deliberately recognisable: a generated repository name
//! starts with `unknown-` and a generated commit identifier with `local-`.

use chrono::{DateTime, Utc};
use std::fs;

/// Private key path used when none is given on the command line
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "gha.pem";

/// Environment variable carrying `owner/repo`
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";

/// Environment variable carrying the commit SHA
pub const ENV_SHA: &str = "GITHUB_SHA";

/// Environment variable carrying the git reference (e.g. `refs/heads/main`)
pub const ENV_REF: &str = "GITHUB_REF";

/// Prefix of generated repository names
pub const FALLBACK_REPOSITORY_PREFIX: &str = "unknown-";

/// Prefix of generated commit identifiers
pub const FALLBACK_SHA_PREFIX: &str = "local-";

/// Placeholder repository name derived from the host identifier
pub fn fallback_repository(host: &str) -> String {
    format!("{}{}", FALLBACK_REPOSITORY_PREFIX, host)
}

/// Placeholder commit identifier derived from a UTC timestamp
pub fn fallback_commit_sha(now: DateTime<Utc>) -> String {
    format!("{}{}", FALLBACK_SHA_PREFIX, now.format("%Y%m%d%H%M%S"))
}

/// Best-effort host identifier.
///
/// Checks `HOSTNAME`, then `COMPUTERNAME`, then `/etc/hostname`, and
/// falls back to `localhost`.
pub fn host_identifier<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|name| lookup(*name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
