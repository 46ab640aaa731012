//! # Error Handling and Report Types
//!
//! This module provides the error type shared by every layer of the repository:
//! the blob store, the document and index parsers, and the orchestrating
//! [`Repository`](crate::Repository).
//!
//! ## Key Types
//!
//! - [`RepoError`]: Main error enum covering every failure `add` and `packages` can report
//! - [`ErrorCode`]: Machine-readable error classification
//! - [`ErrorReport`]: Serializable error report for front-ends
//! - [`RepoResult<T>`]: Convenience type alias for Results using `RepoError`
//!
//! ## Error Report Format
//!
//! Front-ends that need a structured error can render [`RepoError::to_report`]:
//!
//! ```json
//! {
//!   "error": "Human-readable error message",
//!   "code": "machine_readable_error_code",
//!   "key": "vendor/pkg.json",
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```
//!
//! ## Side Effects
//!
//! A failed `add` does not mean nothing was written. The two index tiers are
//! saved independently, so a `StorageIo` error from one tier may arrive after
//! the other tier has already landed.

use chrono::Utc;
use serde::Serialize;

/// Serializable error report for consistent error rendering
#[derive(Serialize, Debug)]
pub struct ErrorReport {
    pub error: String,       // Human-readable error message
    pub code: String,        // Machine-readable error code
    pub key: Option<String>, // Storage key involved, if any
    pub timestamp: String,   // ISO 8601 timestamp
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,          // Raw content key absent in the store
    MalformedDocument, // Uploaded document is not package metadata
    MalformedIndex,    // Stored index does not parse
    ReservedKey,       // Upload targets an index key
    StorageIo,         // Transport failure talking to the store
    ConfigError,       // Invalid configuration
    InternalError,     // Bugs, e.g. unserializable index
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::MalformedDocument => "malformed_document",
            ErrorCode::MalformedIndex => "malformed_index",
            ErrorCode::ReservedKey => "reserved_key",
            ErrorCode::StorageIo => "storage_io",
            ErrorCode::ConfigError => "config_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// Repository error types
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Key not found in storage: {key}")]
    NotFound { key: String },

    #[error("Malformed package document: {0}")]
    MalformedDocument(String),

    #[error("Malformed index at '{key}': {reason}")]
    MalformedIndex { key: String, reason: String },

    #[error("Key '{key}' is reserved for an index")]
    ReservedKey { key: String },

    #[error("Storage I/O error on '{key}': {source}")]
    StorageIo {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepoError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RepoError::NotFound { .. } => ErrorCode::NotFound,
            RepoError::MalformedDocument(_) => ErrorCode::MalformedDocument,
            RepoError::MalformedIndex { .. } => ErrorCode::MalformedIndex,
            RepoError::ReservedKey { .. } => ErrorCode::ReservedKey,
            RepoError::StorageIo { .. } => ErrorCode::StorageIo,
            RepoError::Config(_) => ErrorCode::ConfigError,
            RepoError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Storage key the error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            RepoError::NotFound { key }
            | RepoError::MalformedIndex { key, .. }
            | RepoError::ReservedKey { key }
            | RepoError::StorageIo { key, .. } => Some(key),
            _ => None,
        }
    }

    pub(crate) fn storage_io(key: impl Into<String>, source: std::io::Error) -> Self {
        RepoError::StorageIo {
            key: key.into(),
            source,
        }
    }

    /// Create a serializable error report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            error: self.to_string(),
            code: self.error_code().as_str().to_string(),
            key: self.key().map(str::to_string),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Convenient result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
