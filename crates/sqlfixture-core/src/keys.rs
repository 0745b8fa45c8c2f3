//! Symbolic key helpers.
//!
//! Explicit keys are written by fixture authors and must be usable as the
//! first segment of a dotted reference path. Synthesized keys use `#`, which
//! explicit keys cannot contain, so the two never collide.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Pattern every explicit symbolic key must match.
pub const KEY_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_\-]*$";

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

fn key_regex() -> &'static Regex {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    KEY_RE.get_or_init(|| Regex::new(KEY_PATTERN).expect("KEY_PATTERN is a valid regex"))
}

/// Whether `key` is a valid explicit key.
pub fn is_valid_key(key: &str) -> bool {
    key_regex().is_match(key)
}

/// Reject keys that do not match [`KEY_PATTERN`].
pub fn validate_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Key assigned to the record at `ordinal` (0-based) of an `entity` section
/// that has no explicit key.
pub fn synthesized_key(entity: &str, ordinal: usize) -> String {
    format!("{entity}#{ordinal}")
}

/// Whether `key` has the synthesized form.
pub fn is_synthesized_key(key: &str) -> bool {
    key.rsplit_once('#')
        .is_some_and(|(_, n)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Split a reference path into its head key and member segments.
pub fn split_path(path: &str) -> Result<(&str, Vec<&str>)> {
    let mut parts = path.split(PATH_SEPARATOR);
    let head = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();
    if head.is_empty() || rest.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok((head, rest))
}
