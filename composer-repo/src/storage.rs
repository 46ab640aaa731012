//! # Blob Storage
//!
//! Key-addressed storage of opaque byte values. The repository only needs three
//! operations from a store (existence check, whole-value read, whole-value
//! overwrite), captured by the [`Storage`] trait.
//!
//! ## Implementations
//!
//! - [`FileStorage`]: keys map to files under a root directory
//! - [`InMemoryStorage`]: a shared hash map, used by tests and scratch setups

use crate::error::{RepoError, RepoResult};
use crate::validation::{self, ValidationResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Validated storage key.
///
/// A relative, `/`-separated path such as `packages.json` or `vendor/pkg.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> ValidationResult<Self> {
        let key = key.into();
        validation::validate_key(&key)?;
        Ok(Self(key))
    }

    /// Key from a constant known to be valid
    pub(crate) fn trusted(key: &'static str) -> Self {
        debug_assert!(validation::validate_key(key).is_ok(), "invalid key constant {key}");
        Self(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = validation::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::new(s)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Blob store contract consumed by the repository.
///
/// Every call is a potential suspension point with latency bounded only by
/// the implementation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check whether a value is stored under `key`.
    async fn exists(&self, key: &Key) -> RepoResult<bool>;

    /// Read the whole value stored under `key`.
    ///
    /// Fails with [`RepoError::NotFound`] when the key is absent.
    async fn value(&self, key: &Key) -> RepoResult<Bytes>;

    /// Replace the whole value stored under `key`.
    async fn save(&self, key: &Key, content: Bytes) -> RepoResult<()>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage backed by a directory tree.
///
/// Each key segment becomes a path component under the root. Saves go through
/// a temporary sibling file that is renamed into place, so a concurrent reader
/// sees either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a key
    pub fn path(&self, key: &Key) -> PathBuf {
        key.as_str()
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_file_name(format!(
            ".{file_name}.{}.{suffix}.tmp",
            std::process::id()
        ))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn exists(&self, key: &Key) -> RepoResult<bool> {
        let path = self.path(key);
        fs::try_exists(&path)
            .await
            .map_err(|e| RepoError::storage_io(key.as_str(), e))
    }

    async fn value(&self, key: &Key) -> RepoResult<Bytes> {
        let path = self.path(key);
        match fs::read(&path).await {
            Ok(content) => {
                debug!(key = %key, size = content.len(), "Read value from file storage");
                Ok(Bytes::from(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %key, path = %path.display(), "Key not found in file storage");
                Err(RepoError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read from file storage");
                Err(RepoError::storage_io(key.as_str(), e))
            }
        }
    }

    async fn save(&self, key: &Key, content: Bytes) -> RepoResult<()> {
        let path = self.path(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::storage_io(key.as_str(), e))?;
        }

        let temp = Self::temp_path(&path);
        if let Err(e) = fs::write(&temp, &content).await {
            warn!(key = %key, error = %e, "Failed to write temporary file");
            return Err(RepoError::storage_io(key.as_str(), e));
        }

        if let Err(e) = fs::rename(&temp, &path).await {
            warn!(key = %key, error = %e, "Failed to move temporary file into place");
            // Best effort, the rename error is the one worth reporting
            let _ = fs::remove_file(&temp).await;
            return Err(RepoError::storage_io(key.as_str(), e));
        }

        info!(key = %key, size = content.len(), "Value saved to file storage");
        Ok(())
    }
}

/// Storage backed by an in-process map.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    values: RwLock<HashMap<Key, Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }

    /// All stored keys, sorted
    pub async fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.values.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn exists(&self, key: &Key) -> RepoResult<bool> {
        Ok(self.values.read().await.contains_key(key))
    }

    async fn value(&self, key: &Key) -> RepoResult<Bytes> {
        self.values
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                key: key.to_string(),
            })
    }

    async fn save(&self, key: &Key, content: Bytes) -> RepoResult<()> {
        debug!(key = %key, size = content.len(), "Value saved to memory storage");
        self.values.write().await.insert(key.clone(), content);
        Ok(())
    }
}
