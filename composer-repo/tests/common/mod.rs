//! Common test utilities and helpers
//!
//! Shared store wrappers and upload helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use composer_repo::{InMemoryStorage, Key, RepoError, RepoResult, Storage};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn key(s: &str) -> Key {
    Key::new(s).expect("test key should be valid")
}

/// Store a JSON document under `at` and return its key
pub async fn upload<S: Storage>(storage: &S, at: &str, doc: &Value) -> Key {
    let k = key(at);
    storage
        .save(&k, Bytes::from(serde_json::to_vec(doc).unwrap()))
        .await
        .expect("upload should be stored");
    k
}

/// In-memory store that fails saves to chosen keys and counts calls
#[derive(Default)]
pub struct FailingStorage {
    inner: InMemoryStorage,
    failing: Mutex<HashSet<Key>>,
    pub saves: AtomicUsize,
    pub reads: AtomicUsize,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves_to(&self, key: &Key) {
        self.failing.lock().unwrap().insert(key.clone());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn inner(&self) -> &InMemoryStorage {
        &self.inner
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn exists(&self, key: &Key) -> RepoResult<bool> {
        self.inner.exists(key).await
    }

    async fn value(&self, key: &Key) -> RepoResult<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.value(key).await
    }

    async fn save(&self, key: &Key, content: Bytes) -> RepoResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(key) {
            return Err(RepoError::StorageIo {
                key: key.to_string(),
                source: std::io::Error::other("injected save failure"),
            });
        }
        self.inner.save(key, content).await
    }
}
