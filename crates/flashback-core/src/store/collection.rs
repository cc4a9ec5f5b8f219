//! The primary durable backend: a small on-disk database.
//!
//! Layout under the data directory:
//!
//! ```text
//! flashback-db/
//!   meta.json        {"version": 1}
//!   deck/            the single collection, one JSON file per key
//! ```
//!
//! Every operation opens the database, runs one transaction and closes it
//! again. Writes commit by renaming a fully written temp file into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::utils::{encode_file_key, write_atomic_async};

use super::{StoreBackend, StoreError};

const DB_NAME: &str = "flashback-db";
const META_FILE: &str = "meta.json";
const COLLECTION: &str = "deck";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    version: u32,
}

pub struct CollectionStore {
    db_dir: Option<PathBuf>,
}

impl CollectionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            db_dir: Some(data_dir.as_ref().join(DB_NAME)),
        }
    }

    /// A store for environments with nowhere to put a database.
    /// Every operation fails with `StoreError::Unavailable`.
    pub fn unsupported() -> Self {
        Self { db_dir: None }
    }

    async fn open(&self) -> Result<Connection, StoreError> {
        let db_dir = self
            .db_dir
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("no data directory for database".into()))?;

        tokio::fs::create_dir_all(db_dir).await?;

        let meta_path = db_dir.join(META_FILE);
        let version = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => serde_json::from_slice::<Meta>(&bytes)?.version,
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        if version > SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        let collection = db_dir.join(COLLECTION);
        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "Upgrading database schema");
            tokio::fs::create_dir_all(&collection).await?;
            let meta = serde_json::to_vec(&Meta {
                version: SCHEMA_VERSION,
            })?;
            write_atomic_async(&meta_path, &meta).await?;
        }

        trace!(path = %db_dir.display(), "Database opened");
        Ok(Connection { collection })
    }
}

/// An open database handle. Dropped (closed) after each operation.
struct Connection {
    collection: PathBuf,
}

impl Connection {
    fn record_path(&self, key: &str) -> PathBuf {
        self.collection.join(format!("{}.json", encode_file_key(key)))
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let contents = serde_json::to_vec(value)?;
        write_atomic_async(&self.record_path(key), &contents)
            .await
            .map_err(|e| StoreError::WriteFailure(format!("{}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read(self.record_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailure(format!("{}: {}", key, e))),
        }
    }

    fn close(self) {
        trace!(path = %self.collection.display(), "Database closed");
    }
}

#[async_trait]
impl StoreBackend for CollectionStore {
    fn name(&self) -> &'static str {
        "collection"
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let conn = self.open().await?;
        let result = conn.put(key, value).await;
        conn.close();
        result
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.open().await?;
        let result = conn.get(key).await;
        conn.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_open_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let store = CollectionStore::new(dir.path());

        assert_eq!(store.get("latest").await.unwrap(), None);

        let meta = std::fs::read_to_string(dir.path().join(DB_NAME).join(META_FILE)).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&meta).unwrap(), json!({"version": 1}));
        assert!(dir.path().join(DB_NAME).join(COLLECTION).is_dir());
    }

    #[tokio::test]
    async fn test_put_get_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let value = json!([{"front": "猫", "back": "cat"}]);

        CollectionStore::new(dir.path()).put("latest", &value).await.unwrap();

        let reopened = CollectionStore::new(dir.path());
        assert_eq!(reopened.get("latest").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CollectionStore::new(dir.path());
        store.put("latest", &json!([1])).await.unwrap();
        store.put("latest", &json!([2])).await.unwrap();
        assert_eq!(store.get("latest").await.unwrap(), Some(json!([2])));
    }

    #[tokio::test]
    async fn test_newer_schema_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = dir.path().join(DB_NAME);
        std::fs::create_dir_all(&db_dir).unwrap();
        std::fs::write(db_dir.join(META_FILE), r#"{"version": 2}"#).unwrap();

        let store = CollectionStore::new(dir.path());
        let err = store.get("latest").await.unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { found: 2, supported: 1 }));
    }

    #[tokio::test]
    async fn test_unsupported_is_unavailable() {
        let store = CollectionStore::unsupported();
        assert!(matches!(
            store.put("latest", &json!([])).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.get("latest").await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CollectionStore::new(dir.path());
        store.put("latest", &json!([])).await.unwrap();
        std::fs::write(
            dir.path().join(DB_NAME).join(COLLECTION).join("latest.json"),
            b"{truncated",
        )
        .unwrap();
        assert!(store.get("latest").await.is_err());
    }
}
