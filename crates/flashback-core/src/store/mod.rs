//! Durable key-value storage with ranked fallback.
//!
//! `DurableStore` holds an ordered list of `StoreBackend`s. Each operation
//! is tried against the first backend and falls through to the next one
//! only when the backend fails. A backend answering "not found" is
//! authoritative and is not second-guessed.
//!
//! Backends:
//! - `CollectionStore`: schema-versioned, transactional on-disk database
//! - `LocalStore`: a synchronous JSON-text key/value file

pub mod collection;
pub mod error;
pub mod local;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub use collection::CollectionStore;
pub use error::StoreError;
pub use local::LocalStore;

/// File name of the synchronous store inside the data directory.
const LOCAL_STORE_FILE: &str = "local-storage.json";

#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

/// Which backend ended up serving an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Served {
    pub backend: &'static str,
    pub rank: usize,
}

impl Served {
    pub fn is_fallback(&self) -> bool {
        self.rank > 0
    }
}

pub struct DurableStore {
    backends: Vec<Arc<dyn StoreBackend>>,
}

impl DurableStore {
    pub fn new(backends: Vec<Arc<dyn StoreBackend>>) -> Self {
        Self { backends }
    }

    /// Open the standard chain rooted at `data_dir`: the collection store
    /// first, the synchronous local store second. Without a data directory
    /// the collection store is unsupported and the local store lives in
    /// memory only.
    ///
    /// The local store is returned too so callers can keep small
    /// preferences in it directly.
    pub fn open(data_dir: Option<&Path>) -> (Self, Arc<LocalStore>) {
        let (primary, local) = match data_dir {
            Some(dir) => (
                CollectionStore::new(dir),
                LocalStore::open(dir.join(LOCAL_STORE_FILE)),
            ),
            None => (CollectionStore::unsupported(), LocalStore::in_memory()),
        };
        let local = Arc::new(local);
        let store = Self::new(vec![Arc::new(primary), local.clone()]);
        (store, local)
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<Served, StoreError> {
        let value = serde_json::to_value(value)?;
        let mut last_error = StoreError::Unavailable("no storage backends configured".into());

        for (rank, backend) in self.backends.iter().enumerate() {
            match backend.put(key, &value).await {
                Ok(()) => {
                    return Ok(Served {
                        backend: backend.name(),
                        rank,
                    })
                }
                Err(e) => {
                    debug!(backend = backend.name(), key, error = %e, "Storage write failed, falling back");
                    last_error = e;
                }
            }
        }

        warn!(key, error = %last_error, "All storage backends failed to write");
        Err(last_error)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<(Option<T>, Served), StoreError> {
        let mut last_error = StoreError::Unavailable("no storage backends configured".into());

        for (rank, backend) in self.backends.iter().enumerate() {
            let served = Served {
                backend: backend.name(),
                rank,
            };
            let result = match backend.get(key).await {
                Ok(None) => return Ok((None, served)),
                Ok(Some(value)) => serde_json::from_value(value).map_err(StoreError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(value) => return Ok((Some(value), served)),
                Err(e) => {
                    debug!(backend = backend.name(), key, error = %e, "Storage read failed, falling back");
                    last_error = e;
                }
            }
        }

        warn!(key, error = %last_error, "All storage backends failed to read");
        Err(last_error)
    }

    /// Like `get`, but never fails: any miss or error yields `fallback`.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get(key).await {
            Ok((Some(value), _)) => value,
            _ => fallback,
        }
    }
}
