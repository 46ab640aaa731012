//! # Configuration Management
//!
//! Configuration for a repository instance:
//!
//! - [`StorageConfig`]: where the file-backed blob store lives
//! - [`IndexConfig`]: global index key and merge policy
//! - [`LimitsConfig`]: size limits on uploaded documents
//!
//! ## Loading Configuration
//!
//! Configuration is read from a JSON file; every section and field is optional
//! and falls back to its default:
//!
//! ```rust,no_run
//! # use composer_repo::RepoConfig;
//! // Load from file with fallback to defaults
//! let config = RepoConfig::load_or_default("composer-repo.json")?;
//!
//! // Load from file (fails if file doesn't exist)
//! let config = RepoConfig::load("composer-repo.json")?;
//! # Ok::<(), composer_repo::RepoError>(())
//! ```
//!
//! ```json
//! {
//!   "storage": { "data_dir": "./data" },
//!   "index": { "global_key": "packages.json", "merge_policy": "replace-same-version" },
//!   "limits": { "max_document_size": 1048576 }
//! }
//! ```

use crate::error::{RepoError, RepoResult};
use crate::packages::MergePolicy;
use crate::storage::Key;
use crate::validation::MAX_DOCUMENT_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default key of the global index
pub const DEFAULT_GLOBAL_KEY: &str = "packages.json";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Storage configuration for the file-backed store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the blob store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Key of the global index
    #[serde(default = "default_global_key")]
    pub global_key: String,
    /// How re-published versions are merged
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            global_key: default_global_key(),
            merge_policy: MergePolicy::default(),
        }
    }
}

/// Size limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted package document, in bytes
    #[serde(default = "default_max_document_size")]
    pub max_document_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_size: default_max_document_size(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_global_key() -> String {
    DEFAULT_GLOBAL_KEY.to_string()
}

fn default_max_document_size() -> usize {
    MAX_DOCUMENT_SIZE
}

impl RepoConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Config`] if the file cannot be read, is not valid
    /// JSON, or fails [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> RepoResult<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|e| {
            RepoError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: RepoConfig = serde_json::from_str(&config_str).map_err(|e| {
            RepoError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with fallback to defaults.
    ///
    /// A missing file yields [`RepoConfig::default`]; a file that exists but
    /// cannot be parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> RepoResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values that serde cannot.
    ///
    /// The global key must be a valid single-segment key so it cannot collide
    /// with a per-package key, which always has two segments.
    pub fn validate(&self) -> RepoResult<()> {
        let key = self.global_key()?;
        if key.as_str().contains('/') {
            return Err(RepoError::Config(format!(
                "Global index key '{key}' must not contain '/'"
            )));
        }

        if self.limits.max_document_size == 0 {
            return Err(RepoError::Config(
                "limits.max_document_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed global index key
    pub fn global_key(&self) -> RepoResult<Key> {
        Key::new(self.index.global_key.as_str()).map_err(|e| {
            RepoError::Config(format!(
                "Invalid global index key '{}': {e}",
                self.index.global_key
            ))
        })
    }
}
