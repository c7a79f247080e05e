//! Object key derivation.
//!
//! Keys are the base file name of the uploaded path. When configured, every
//! character outside `[A-Za-z0-9._-]` is replaced with `_` so that the
//! resulting URL needs no escaping. The rewrite is deterministic, so uploading
//! the same file name twice yields the same key.

use crate::DEFAULT_CONTENT_TYPE;
use crate::error::{Error, Result};
use std::path::Path;

/// Substitute for characters outside the URL-safe set.
pub const URLSAFE_SUBSTITUTE: char = '_';

/// Whether a character survives [`make_urlsafe`] unchanged.
pub fn is_url_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')
}

/// Replace every character outside the URL-safe set with `_`.
///
/// One substitute is emitted per character, so multi-byte characters do not
/// expand into several underscores.
pub fn make_urlsafe(name: &str) -> String {
    name.chars()
        .map(|c| if is_url_safe(c) { c } else { URLSAFE_SUBSTITUTE })
        .collect()
}

/// Derive the object key for a local file.
pub fn object_key_for_path(path: &Path, replace_non_urlsafe: bool) -> Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", path.display())))?;
    let file_name = file_name.to_str().ok_or_else(|| {
        Error::InvalidPath(format!("{} is not valid UTF-8", path.display()))
    })?;

    if replace_non_urlsafe {
        Ok(make_urlsafe(file_name))
    } else {
        Ok(file_name.to_string())
    }
}

/// Guess a content type from the key's extension.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
