//! # Composer Repository
//!
//! Keeps the two index tiers in step with published package documents:
//!
//! - the global index (`packages.json` by default) lists every package
//! - each package's own index (`vendor/pkg.json`) lists that package alone
//!
//! [`Repository::add`] reads an uploaded document from the store and merges it
//! into both tiers. Each tier is updated with a load-merge-save cycle that runs
//! while holding that tier's key lock, and the two tiers run concurrently.
//!
//! ## Concurrency
//!
//! Saves to the same key are serialized by a lock table shared by all clones
//! of a `Repository`, so concurrent `add` calls through it never lose each
//! other's updates. Separate processes writing the same store are not
//! coordinated and must be serialized externally, e.g. by a single writer
//! front-end.
//!
//! ## Partial failure
//!
//! The two tiers are saved independently and neither save is abandoned when
//! the other fails. If one fails, `add` returns its error even though the other
//! tier may already hold the document. Running `add` again for the same key
//! brings the lagging tier up to date; with
//! [`MergePolicy::ReplaceSameVersion`] this does not duplicate the entry in
//! the tier that had already landed.
//!
//! The error is reported only after the other tier's save has finished, so a
//! caller never sees a failure while a write is still in flight.

use crate::config::{RepoConfig, DEFAULT_GLOBAL_KEY};
use crate::error::{RepoError, RepoResult};
use crate::name::Name;
use crate::package::Package;
use crate::packages::{Merge, MergePolicy, Packages};
use crate::storage::{Key, Storage};
use crate::validation::MAX_DOCUMENT_SIZE;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Per-key writer locks.
///
/// Entries are kept for the lifetime of the table, one per key ever written.
#[derive(Debug, Default)]
struct KeyLocks(Mutex<HashMap<Key, Arc<Mutex<()>>>>);

impl KeyLocks {
    async fn acquire(&self, key: &Key) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.0.lock().await;
            map.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Result of a successful [`Repository::add`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub name: Name,
    pub version: Option<String>,
    pub global_key: Key,
    pub package_key: Key,
    /// Merge outcome in the global index
    pub global: Merge,
    /// Merge outcome in the package's own index
    pub package: Merge,
}

/// Composer repository over a blob store.
pub struct Repository<S> {
    storage: Arc<S>,
    global_key: Key,
    policy: MergePolicy,
    max_document_size: usize,
    locks: Arc<KeyLocks>,
}

impl<S> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            global_key: self.global_key.clone(),
            policy: self.policy,
            max_document_size: self.max_document_size,
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: Storage> Repository<S> {
    /// Repository with default settings: global index at `packages.json`,
    /// append-only merges.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            global_key: Key::trusted(DEFAULT_GLOBAL_KEY),
            policy: MergePolicy::default(),
            max_document_size: MAX_DOCUMENT_SIZE,
            locks: Arc::default(),
        }
    }

    /// Repository configured from the index and limits sections of `config`.
    pub fn with_config(storage: Arc<S>, config: &RepoConfig) -> RepoResult<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            global_key: config.global_key()?,
            policy: config.index.merge_policy,
            max_document_size: config.limits.max_document_size,
            locks: Arc::default(),
        })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn global_key(&self) -> &Key {
        &self.global_key
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.policy
    }

    /// Read the global index. An absent index reads as empty.
    pub async fn packages(&self) -> RepoResult<Packages> {
        self.load(&self.global_key).await
    }

    /// Read one package's own index. An absent index reads as empty.
    pub async fn packages_of(&self, name: &Name) -> RepoResult<Packages> {
        self.load(&name.key()?).await
    }

    /// Merge the package document stored under `key` into both indices.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotFound`] if nothing is stored under `key`
    /// - [`RepoError::MalformedDocument`] if the document is not package metadata;
    ///   no index is written in that case
    /// - [`RepoError::MalformedIndex`] if an existing index does not parse
    /// - [`RepoError::StorageIo`] on store failures
    ///
    /// An error does not imply that nothing was written: see the module docs.
    pub async fn add(&self, key: &Key) -> RepoResult<Added> {
        let content = self.storage.value(key).await?;
        let pack = Package::from_slice_with_limit(&content, self.max_document_size)?;
        let package_key = pack.name().key()?;

        debug!(
            key = %key,
            package = %pack.name(),
            version = pack.version().unwrap_or("-"),
            "Adding package to indices"
        );

        let (global, package) = tokio::join!(
            self.update(&self.global_key, &pack),
            self.update(&package_key, &pack)
        );

        match (global, package) {
            (Ok(global), Ok(package)) => {
                info!(
                    package = %pack.name(),
                    version = pack.version().unwrap_or("-"),
                    global_key = %self.global_key,
                    package_key = %package_key,
                    "Package added to repository"
                );
                Ok(Added {
                    name: pack.name().clone(),
                    version: pack.version().map(str::to_string),
                    global_key: self.global_key.clone(),
                    package_key,
                    global,
                    package,
                })
            }
            (Err(e), Ok(_)) => {
                warn!(
                    package = %pack.name(),
                    written = %package_key,
                    failed = %self.global_key,
                    error = %e,
                    "Package index saved but global index failed, tiers diverge"
                );
                Err(e)
            }
            (Ok(_), Err(e)) => {
                warn!(
                    package = %pack.name(),
                    written = %self.global_key,
                    failed = %package_key,
                    error = %e,
                    "Global index saved but package index failed, tiers diverge"
                );
                Err(e)
            }
            (Err(global_err), Err(package_err)) => {
                warn!(
                    package = %pack.name(),
                    error = %package_err,
                    "Package index update failed as well"
                );
                Err(global_err)
            }
        }
    }

    /// Store a raw document under `key`, then [`add`](Self::add) it.
    ///
    /// The document is parsed before it is stored, so malformed uploads leave
    /// the store untouched.
    ///
    /// # Errors
    ///
    /// [`RepoError::ReservedKey`] if `key` is an index key (see
    /// [`is_index_key`](Self::is_index_key)), otherwise as [`add`](Self::add).
    pub async fn publish(&self, key: &Key, content: Bytes) -> RepoResult<Added> {
        if self.is_index_key(key) {
            warn!(key = %key, "Refusing to store a package document over an index");
            return Err(RepoError::ReservedKey {
                key: key.to_string(),
            });
        }
        Package::from_slice_with_limit(&content, self.max_document_size)?;
        self.storage.save(key, content).await?;
        self.add(key).await
    }

    /// Whether `key` is the global index or the own index of some package name.
    pub fn is_index_key(&self, key: &Key) -> bool {
        *key == self.global_key || Name::from_key(key).is_some()
    }

    async fn load(&self, key: &Key) -> RepoResult<Packages> {
        if !self.storage.exists(key).await? {
            debug!(key = %key, "Index absent, starting empty");
            return Ok(Packages::empty());
        }

        let content = match self.storage.value(key).await {
            Ok(content) => content,
            // Removed between the existence check and the read
            Err(RepoError::NotFound { .. }) => return Ok(Packages::empty()),
            Err(e) => return Err(e),
        };

        let packages = Packages::from_slice(&content).map_err(|e| {
            warn!(key = %key, error = %e, "Stored index does not parse");
            RepoError::MalformedIndex {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(key = %key, packages = packages.len(), "Loaded index");
        Ok(packages)
    }

    async fn update(&self, key: &Key, pack: &Package) -> RepoResult<Merge> {
        let _guard = self.locks.acquire(key).await;

        let mut packages = self.load(key).await?;
        let merge = packages.add(pack, self.policy);
        self.storage.save(key, packages.to_bytes()?).await?;

        debug!(key = %key, package = %pack.name(), merge = ?merge, "Index updated");
        Ok(merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    fn key(s: &str) -> Key {
        Key::new(s).expect("test key should be valid")
    }

    fn name(s: &str) -> Name {
        Name::new(s).expect("test name should be valid")
    }

    async fn upload(storage: &InMemoryStorage, at: &str, doc: serde_json::Value) -> Key {
        let k = key(at);
        storage
            .save(&k, Bytes::from(serde_json::to_vec(&doc).unwrap()))
            .await
            .unwrap();
        k
    }

    fn repo() -> (Arc<InMemoryStorage>, Repository<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (storage.clone(), Repository::new(storage))
    }

    #[tokio::test]
    async fn test_add_into_empty_repository() {
        let (storage, repo) = repo();
        let k = upload(
            &storage,
            "uploads/pkg.json",
            json!({"name": "vendor/pkg", "version": "1.0.0"}),
        )
        .await;

        let added = repo.add(&k).await.expect("add should succeed");
        assert_eq!(added.name, name("vendor/pkg"));
        assert_eq!(added.version.as_deref(), Some("1.0.0"));
        assert_eq!(added.global_key, key("packages.json"));
        assert_eq!(added.package_key, key("vendor/pkg.json"));

        let global = repo.packages().await.unwrap();
        assert_eq!(global.version_strings(&name("vendor/pkg")), vec!["1.0.0"]);
        assert_eq!(global.len(), 1);

        let own = repo.packages_of(&name("vendor/pkg")).await.unwrap();
        assert_eq!(own.version_strings(&name("vendor/pkg")), vec!["1.0.0"]);
        assert_eq!(own.len(), 1);
    }

    #[tokio::test]
    async fn test_add_keeps_existing_packages() {
        let (storage, repo) = repo();
        let existing = upload(
            &storage,
            "packages.json",
            json!({"packages": {"other/pkg": [{"name": "other/pkg", "version": "2.0.0", "type": "library"}]}}),
        )
        .await;
        let before = Packages::from_slice(&storage.value(&existing).await.unwrap()).unwrap();

        let k = upload(
            &storage,
            "uploads/pkg.json",
            json!({"name": "vendor/pkg", "version": "1.0.0"}),
        )
        .await;
        repo.add(&k).await.unwrap();

        let global = repo.packages().await.unwrap();
        assert_eq!(
            global.versions(&name("other/pkg")),
            before.versions(&name("other/pkg"))
        );
        assert_eq!(global.version_strings(&name("vendor/pkg")), vec!["1.0.0"]);

        // The per-name index only sees its own package
        let own = repo.packages_of(&name("vendor/pkg")).await.unwrap();
        assert!(!own.contains(&name("other/pkg")));
    }

    #[tokio::test]
    async fn test_missing_raw_document() {
        let (storage, repo) = repo();

        let err = repo.add(&key("uploads/missing.json")).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NotFound);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_sequential_versions_keep_order() {
        let (storage, repo) = repo();
        for version in ["1.0.0", "1.0.1"] {
            let k = upload(
                &storage,
                &format!("uploads/pkg-{version}.json"),
                json!({"name": "vendor/pkg", "version": version}),
            )
            .await;
            repo.add(&k).await.unwrap();
        }

        let own = repo.packages_of(&name("vendor/pkg")).await.unwrap();
        assert_eq!(
            own.version_strings(&name("vendor/pkg")),
            vec!["1.0.0", "1.0.1"]
        );
    }

    #[tokio::test]
    async fn test_packages_of_unknown_name_is_empty() {
        let (_storage, repo) = repo();
        assert!(repo.packages().await.unwrap().is_empty());
        assert!(repo
            .packages_of(&name("nobody/nothing"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_index() {
        let (storage, repo) = repo();
        upload(&storage, "packages.json", json!({"packages": {"vendor/pkg": "nope"}})).await;
        let k = upload(
            &storage,
            "uploads/pkg.json",
            json!({"name": "vendor/pkg", "version": "1.0.0"}),
        )
        .await;

        let err = repo.packages().await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MalformedIndex);
        assert_eq!(err.key(), Some("packages.json"));

        // The global tier fails, the per-name tier still lands
        let err = repo.add(&k).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MalformedIndex);
        let own = repo.packages_of(&name("vendor/pkg")).await.unwrap();
        assert_eq!(own.version_strings(&name("vendor/pkg")), vec!["1.0.0"]);
    }

    #[tokio::test]
    async fn test_replace_policy_repository() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut config = RepoConfig::default();
        config.index.merge_policy = MergePolicy::ReplaceSameVersion;
        let repo = Repository::with_config(storage.clone(), &config).unwrap();

        let k = upload(
            &storage,
            "uploads/pkg.json",
            json!({"name": "vendor/pkg", "version": "1.0.0"}),
        )
        .await;
        let first = repo.add(&k).await.unwrap();
        let second = repo.add(&k).await.unwrap();

        assert_eq!(first.global, Merge::Appended);
        assert_eq!(second.global, Merge::Replaced);
        assert_eq!(second.package, Merge::Replaced);
        let global = repo.packages().await.unwrap();
        assert_eq!(global.version_strings(&name("vendor/pkg")), vec!["1.0.0"]);
    }

    #[tokio::test]
    async fn test_custom_global_key() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut config = RepoConfig::default();
        config.index.global_key = "index.json".to_string();
        let repo = Repository::with_config(storage.clone(), &config).unwrap();

        let k = upload(
            &storage,
            "uploads/pkg.json",
            json!({"name": "vendor/pkg", "version": "1.0.0"}),
        )
        .await;
        repo.add(&k).await.unwrap();

        assert!(storage.exists(&key("index.json")).await.unwrap());
        assert!(!storage.exists(&key("packages.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_publish_rejects_before_storing() {
        let (storage, repo) = repo();

        let err = repo
            .publish(
                &key("uploads/vendor/bad.json"),
                Bytes::from_static(br#"{"version":"1.0.0"}"#),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MalformedDocument);
        assert!(storage.is_empty().await);

        let added = repo
            .publish(
                &key("uploads/vendor/pkg-1.0.0.json"),
                Bytes::from_static(br#"{"name":"vendor/pkg","version":"1.0.0"}"#),
            )
            .await
            .unwrap();
        assert_eq!(added.name, name("vendor/pkg"));
        assert_eq!(
            storage.keys().await,
            vec![
                key("packages.json"),
                key("uploads/vendor/pkg-1.0.0.json"),
                key("vendor/pkg.json")
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_refuses_index_keys() {
        let (storage, repo) = repo();
        repo.publish(
            &key("uploads/other/pkg-2.0.0.json"),
            Bytes::from_static(br#"{"name":"other/pkg","version":"2.0.0"}"#),
        )
        .await
        .unwrap();
        let global_before = storage.value(&key("packages.json")).await.unwrap();
        let own_before = storage.value(&key("other/pkg.json")).await.unwrap();

        let doc = Bytes::from_static(br#"{"name":"vendor/pkg","version":"1.0.0"}"#);
        for target in ["packages.json", "other/pkg.json", "vendor/pkg.json"] {
            let err = repo.publish(&key(target), doc.clone()).await.unwrap_err();
            assert_eq!(err.error_code(), ErrorCode::ReservedKey);
            assert_eq!(err.key(), Some(target));
        }

        assert_eq!(storage.value(&key("packages.json")).await.unwrap(), global_before);
        assert_eq!(storage.value(&key("other/pkg.json")).await.unwrap(), own_before);
        assert!(!storage.exists(&key("vendor/pkg.json")).await.unwrap());
        let global = repo.packages().await.unwrap();
        assert_eq!(global.names().collect::<Vec<_>>(), vec!["other/pkg"]);
        assert_eq!(
            repo.packages_of(&name("other/pkg"))
                .await
                .unwrap()
                .version_strings(&name("other/pkg")),
            vec!["2.0.0"]
        );
    }

    #[tokio::test]
    async fn test_publish_refuses_custom_global_key() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut config = RepoConfig::default();
        config.index.global_key = "index.json".to_string();
        let repo = Repository::with_config(storage.clone(), &config).unwrap();

        assert!(repo.is_index_key(&key("index.json")));
        assert!(!repo.is_index_key(&key("uploads/vendor/pkg-1.0.0.json")));
        let err = repo
            .publish(
                &key("index.json"),
                Bytes::from_static(br#"{"name":"vendor/pkg","version":"1.0.0"}"#),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ReservedKey);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_package_document_at_index_key_is_malformed() {
        let (storage, repo) = repo();
        upload(&storage, "packages.json", json!({"name": "vendor/pkg", "version": "1.0.0"})).await;
        upload(&storage, "other/pkg.json", json!({"name": "other/pkg", "version": "2.0.0"})).await;

        let err = repo.packages().await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MalformedIndex);
        assert_eq!(err.key(), Some("packages.json"));

        let err = repo.packages_of(&name("other/pkg")).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MalformedIndex);
        assert_eq!(err.key(), Some("other/pkg.json"));
    }
}
