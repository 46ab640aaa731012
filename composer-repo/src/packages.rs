//! # Package Index Documents
//!
//! In-memory form of a JSON index, used for both the global `packages.json`
//! and each package's own index:
//!
//! ```json
//! {
//!   "packages": {
//!     "vendor/pkg": [
//!       {"name": "vendor/pkg", "version": "1.0.0"},
//!       {"name": "vendor/pkg", "version": "1.0.1"}
//!     ]
//!   }
//! }
//! ```
//!
//! Package names and their entries keep the order in which they were merged.
//! Top-level fields other than `packages` (`notify`, `metadata-url`, ...) are
//! kept as they were loaded.

use crate::error::{RepoError, RepoResult};
use crate::name::Name;
use crate::package::Package;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

type Entries = IndexMap<String, Vec<Map<String, Value>>>;

/// How a document is merged into a name that already has entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Always append. Adding the same version twice leaves two entries.
    #[default]
    Append,
    /// Replace the entry with the same `version` string in place, append otherwise.
    ReplaceSameVersion,
}

/// What [`Packages::add`] did with a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Appended,
    Replaced,
}

/// Index view: package names mapped to their metadata entries.
///
/// The `packages` field is required when parsing, so a JSON object that is
/// not an index (a package document, say) is rejected rather than read as an
/// empty index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Packages {
    #[serde(deserialize_with = "deserialize_entries")]
    packages: Entries,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Accepts the `"packages": []` form Composer emits for an empty repository.
fn deserialize_entries<'de, D>(deserializer: D) -> Result<Entries, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Map(Entries),
        List(Vec<Value>),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Map(entries) => Ok(entries),
        Repr::List(list) if list.is_empty() => Ok(Entries::new()),
        Repr::List(_) => Err(serde::de::Error::custom(
            "'packages' must map package names to arrays of metadata objects",
        )),
    }
}

impl Packages {
    /// Empty index, the identity for [`add`](Self::add)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse index bytes.
    ///
    /// The error carries no key; callers reading from storage report it as
    /// [`RepoError::MalformedIndex`] against the key they read.
    pub fn from_slice(content: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(content)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_bytes(&self) -> RepoResult<Bytes> {
        serde_json::to_vec_pretty(self)
            .map(Bytes::from)
            .map_err(|e| RepoError::Internal(format!("Failed to serialize package index: {e}")))
    }

    /// Merge a document into the entries of its name.
    ///
    /// Nothing here can fail, so the view is either untouched or holds the
    /// whole document. Entries of other names are never modified.
    pub fn add(&mut self, pack: &Package, policy: MergePolicy) -> Merge {
        let entries = self
            .packages
            .entry(pack.name().as_str().to_string())
            .or_default();

        if policy == MergePolicy::ReplaceSameVersion {
            if let Some(version) = pack.version() {
                let same = entries
                    .iter_mut()
                    .find(|entry| entry.get("version").and_then(Value::as_str) == Some(version));
                if let Some(slot) = same {
                    *slot = pack.json().clone();
                    return Merge::Replaced;
                }
            }
        }

        entries.push(pack.json().clone());
        Merge::Appended
    }

    /// Entries recorded for a name, in merge order
    pub fn versions(&self, name: &Name) -> Option<&[Map<String, Value>]> {
        self.packages.get(name.as_str()).map(Vec::as_slice)
    }

    /// Version strings recorded for a name, skipping entries without one
    pub fn version_strings(&self, name: &Name) -> Vec<&str> {
        self.versions(name)
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| entry.get("version").and_then(Value::as_str))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.packages.contains_key(name.as_str())
    }

    /// Number of package names
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
