//! Synchronous key/value store with text values.
//!
//! Each value is stored as JSON text under its key. The whole map is kept
//! in memory and written back to a single JSON file on every change. The
//! typed `get`/`set` helpers never fail: reads fall back to a caller
//! default and writes that cannot be stored are dropped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::task::{self, JoinError};
use tracing::{debug, warn};

use crate::utils::write_atomic;

use super::{StoreBackend, StoreError};

/// Default size limit of the serialized store, in bytes.
const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Clones share the same entries.
#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    quota: usize,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl LocalStore {
    /// Open the store backed by `path`. A missing or unreadable file starts
    /// an empty store.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Discarding unreadable local store");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            quota: DEFAULT_QUOTA_BYTES,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            quota: DEFAULT_QUOTA_BYTES,
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = bytes;
        self
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::ReadFailure("local store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    pub fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::WriteFailure("local store lock poisoned".into()))?;

        let mut updated = entries.clone();
        updated.insert(key.to_string(), value);

        let contents = serde_json::to_vec(&updated)?;
        if contents.len() > self.quota {
            return Err(StoreError::WriteFailure(format!(
                "quota exceeded ({} > {} bytes)",
                contents.len(),
                self.quota
            )));
        }

        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_atomic(path, &contents)
                .map_err(|e| StoreError::WriteFailure(format!("{}: {}", key, e)))?;
        }

        *entries = updated;
        Ok(())
    }

    /// Typed read. Missing keys, unparseable values and store failures all
    /// yield `fallback`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get_item(key) {
            Ok(Some(text)) => serde_json::from_str(&text).unwrap_or(fallback),
            Ok(None) => fallback,
            Err(e) => {
                debug!(key, error = %e, "Local store read failed");
                fallback
            }
        }
    }

    /// Typed best-effort write.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|text| self.set_item(key, text));
        if let Err(e) = result {
            debug!(key, error = %e, "Local store write dropped");
        }
    }
}

#[async_trait]
impl StoreBackend for LocalStore {
    fn name(&self) -> &'static str {
        "local-storage"
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        let store = self.clone();
        let key = key.to_string();
        task::spawn_blocking(move || store.set_item(&key, text))
            .await
            .map_err(map_join_err)?
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.get_item(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

fn map_join_err(err: JoinError) -> StoreError {
    StoreError::WriteFailure(format!("local store task failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_roundtrip_and_defaults() {
        let store = LocalStore::in_memory();
        assert_eq!(store.get("flashback:index", 0usize), 0);

        store.set("flashback:index", &3usize);
        store.set("flashback:flipped", &true);
        assert_eq!(store.get("flashback:index", 0usize), 3);
        assert!(store.get("flashback:flipped", false));
        assert_eq!(store.get_item("flashback:flipped").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_unparseable_value_yields_fallback() {
        let store = LocalStore::in_memory();
        store.set_item("flashback:index", "{oops".into()).unwrap();
        assert_eq!(store.get("flashback:index", 0usize), 0);

        store.set("flashback:index", &-4i64);
        assert_eq!(store.get("flashback:index", 0usize), 0);
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local-storage.json");

        LocalStore::open(path.clone()).set("flashback:shuffle", &true);

        let reopened = LocalStore::open(path);
        assert!(reopened.get("flashback:shuffle", false));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = LocalStore::open(path);
        assert_eq!(store.get("flashback:index", 9usize), 9);
        store.set("flashback:index", &1usize);
        assert_eq!(store.get("flashback:index", 9usize), 1);
    }

    #[tokio::test]
    async fn test_backend_put_writes_off_runtime_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        let store = LocalStore::open(path.clone());

        StoreBackend::put(&store, "latest", &serde_json::json!([{"front": "猫"}]))
            .await
            .unwrap();
        assert_eq!(
            StoreBackend::get(&store, "latest").await.unwrap(),
            Some(serde_json::json!([{"front": "猫"}]))
        );

        let reopened = LocalStore::open(path);
        assert!(reopened.get_item("latest").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backend_put_over_quota_fails() {
        let store = LocalStore::in_memory().with_quota(8);
        let result = StoreBackend::put(&store, "latest", &serde_json::json!("far too long")).await;
        assert!(matches!(result, Err(StoreError::WriteFailure(_))));
    }

    #[test]
    fn test_quota_exceeded_is_dropped_and_keeps_old_value() {
        let store = LocalStore::in_memory().with_quota(40);
        store.set("k", &"short");
        store.set("k", &"a value far too long to fit in the tiny quota");
        assert_eq!(store.get("k", String::new()), "short");
        assert!(store.set_item("k", "x".repeat(100)).is_err());
    }
}
