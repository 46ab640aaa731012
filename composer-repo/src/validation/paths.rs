//! # Input Validation: Storage Keys
//!
//! Storage keys are relative, `/`-separated paths. [`FileStorage`] joins them
//! onto its root directory, so a key must never escape that root.
//!
//! [`FileStorage`]: crate::storage::FileStorage

use super::limits::{MAX_KEY_LENGTH, MAX_PATH_DEPTH};
use super::{ValidationError, ValidationResult};

/// Validate that a storage key is safe to map onto a directory tree.
///
/// Rejects empty keys, absolute keys, `.`/`..` and empty segments, backslashes,
/// shell metacharacters, null bytes and control characters.
///
/// # Examples
///
/// ```rust
/// use composer_repo::validation::validate_key;
///
/// assert!(validate_key("packages.json").is_ok());
/// assert!(validate_key("vendor/pkg.json").is_ok());
/// assert!(validate_key("/etc/passwd").is_err());
/// assert!(validate_key("vendor/../packages.json").is_err());
/// ```
pub fn validate_key(key: &str) -> ValidationResult<&str> {
    if key.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(ValidationError::TooLong {
            actual: key.len(),
            max: MAX_KEY_LENGTH,
        });
    }

    if key.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if key.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if key.starts_with('/') {
        return Err(ValidationError::AbsolutePath {
            path: key.to_string(),
        });
    }

    let segments: Vec<&str> = key.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(ValidationError::PathTraversal {
            path: key.to_string(),
        });
    }

    if segments.len() > MAX_PATH_DEPTH {
        return Err(ValidationError::PathTooDeep {
            actual: segments.len(),
            max: MAX_PATH_DEPTH,
        });
    }

    let dangerous_patterns = [
        "\\", "~", "$", "`", "|", "&", ";", "<", ">", "(", ")", "{", "}", "[", "]", "*", "?",
    ];

    if dangerous_patterns.iter().any(|p| key.contains(p)) {
        return Err(ValidationError::InvalidCharacters {
            input: key.to_string(),
        });
    }

    Ok(key)
}
