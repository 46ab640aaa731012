//! # Input Validation: Size Limits
//!
//! Limits applied to uploaded documents, package names and storage keys.

use super::{ValidationError, ValidationResult};

/// Default maximum size of an uploaded package document (1 MB)
pub const MAX_DOCUMENT_SIZE: usize = 1024 * 1024;

/// Maximum allowed package name length, vendor and package combined
pub const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// Maximum allowed storage key length
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum allowed number of segments in a storage key
pub const MAX_PATH_DEPTH: usize = 10;

/// Validate a document size against a limit.
///
/// `max_size` defaults to [`MAX_DOCUMENT_SIZE`].
pub fn validate_document_size(size: usize, max_size: Option<usize>) -> ValidationResult<()> {
    let limit = max_size.unwrap_or(MAX_DOCUMENT_SIZE);

    if size > limit {
        return Err(ValidationError::DocumentTooLarge {
            actual: size,
            max: limit,
        });
    }

    Ok(())
}
