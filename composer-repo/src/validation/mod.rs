//! # Input Validation Utilities
//!
//! This module provides validation helpers for the two kinds of untrusted
//! strings the repository handles: storage keys and package names. Both end up
//! as paths in a [`FileStorage`](crate::storage::FileStorage) root, so both are
//! checked for traversal and control characters before use.
//!
//! ## Usage
//!
//! ```rust
//! use composer_repo::validation::{validate_key, validate_package_name};
//!
//! assert!(validate_key("uploads/vendor-pkg-1.0.0.json").is_ok());
//! assert!(validate_key("../etc/passwd").is_err());
//!
//! assert!(validate_package_name("vendor/pkg").is_ok());
//! assert!(validate_package_name("no-vendor").is_err());
//! ```

pub mod error;
pub mod limits;
pub mod names;
pub mod paths;

pub use self::{
    error::ValidationError,
    limits::{
        validate_document_size, MAX_DOCUMENT_SIZE, MAX_KEY_LENGTH, MAX_PACKAGE_NAME_LENGTH,
        MAX_PATH_DEPTH,
    },
    names::validate_package_name,
    paths::validate_key,
};

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
