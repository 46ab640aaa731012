//! # Input Validation: Package Names
//!
//! Composer package names take the form `vendor/package`.

use super::limits::MAX_PACKAGE_NAME_LENGTH;
use super::{ValidationError, ValidationResult};

/// Validate a Composer package name.
///
/// A valid name has exactly one `/` separating a non-empty vendor from a
/// non-empty package, and both parts contain only ASCII letters, digits, `.`,
/// `-` and `_`. Neither part may start with a `.`. Names are case-sensitive
/// and are returned unchanged.
pub fn validate_package_name(name: &str) -> ValidationResult<&str> {
    if name.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if name.len() > MAX_PACKAGE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            actual: name.len(),
            max: MAX_PACKAGE_NAME_LENGTH,
        });
    }

    if name.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    let (vendor, package) = name
        .split_once('/')
        .ok_or_else(|| ValidationError::InvalidFormat {
            reason: format!("'{name}' is not of the form vendor/package"),
        })?;

    for part in [vendor, package] {
        if part.is_empty() {
            return Err(ValidationError::InvalidFormat {
                reason: format!("'{name}' has an empty vendor or package part"),
            });
        }

        if part.starts_with('.') {
            return Err(ValidationError::InvalidFormat {
                reason: format!("'{name}' has a part starting with '.'"),
            });
        }

        if !part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ValidationError::InvalidCharacters {
                input: name.to_string(),
            });
        }
    }

    Ok(name)
}
