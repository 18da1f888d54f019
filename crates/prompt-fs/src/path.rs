//! Source location validation
//!
//! A source is either a git URL (`http://`, `https://`, `git@`) or an
//! absolute local directory path. Values containing parent-directory
//! traversal or NUL bytes are rejected outright, before any I/O happens.

use std::path::Path;

use crate::{Error, Result};

/// URL prefixes recognised as git remotes.
pub const GIT_URL_SCHEMES: &[&str] = &["http://", "https://", "git@"];

/// Returns `true` when the value looks like a git remote URL.
pub fn is_git_url(value: &str) -> bool {
    GIT_URL_SCHEMES.iter().any(|s| value.starts_with(s))
}

/// Validate a configured source location.
///
/// # Errors
///
/// Returns [`Error::InvalidSource`] when the value is empty, contains `..`
/// or a NUL byte, or is a relative local path.
pub fn validate_source(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_source(value, "empty source"));
    }
    if value.contains('\0') {
        return Err(Error::invalid_source(value, "contains NUL byte"));
    }
    if value.contains("..") {
        return Err(Error::invalid_source(
            value,
            "parent-directory traversal is not allowed",
        ));
    }
    if is_git_url(value) {
        return Ok(());
    }
    if !Path::new(value).is_absolute() {
        return Err(Error::invalid_source(
            value,
            "local paths must be absolute",
        ));
    }
    Ok(())
}
