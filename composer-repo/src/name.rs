//! Package names and the storage keys derived from them.

use crate::error::{RepoError, RepoResult};
use crate::storage::Key;
use crate::validation;
use std::fmt;

/// Suffix appended to a package name to form its index key
const INDEX_SUFFIX: &str = ".json";

/// Composer package name, `vendor/package`.
///
/// Names are case-sensitive: `Vendor/Pkg` and `vendor/pkg` are distinct
/// packages with distinct index keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    /// Validate and wrap a package name.
    ///
    /// Invalid names are reported as [`RepoError::MalformedDocument`] since
    /// they always originate from document content.
    pub fn new(name: impl Into<String>) -> RepoResult<Self> {
        let name = name.into();
        validation::validate_package_name(&name)
            .map_err(|e| RepoError::MalformedDocument(format!("Invalid package name: {e}")))?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key of this package's own index.
    ///
    /// `vendor/pkg` maps to `vendor/pkg.json`. The mapping only appends a fixed
    /// suffix, so distinct names give distinct keys, and every derived key has
    /// two segments so it never lands on a single-segment global index key.
    pub fn key(&self) -> RepoResult<Key> {
        Key::new(format!("{}{INDEX_SUFFIX}", self.0)).map_err(|e| {
            RepoError::MalformedDocument(format!(
                "Package name '{}' does not map to a valid key: {e}",
                self.0
            ))
        })
    }

    /// Name whose own index lives at `key`, if any.
    ///
    /// Inverse of [`key`](Self::key): `vendor/pkg.json` gives `vendor/pkg`.
    pub fn from_key(key: &Key) -> Option<Self> {
        key.as_str()
            .strip_suffix(INDEX_SUFFIX)
            .and_then(|name| Self::new(name).ok())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
