//! Named response caches on disk.
//!
//! ```text
//! caches/
//!   index.json                 ["flashback-shell-v1", "flashback-api-v1"]
//!   flashback-shell-v1.json    {"GET https://…/index.html": {status, headers, body}}
//! ```
//!
//! Caches are listed in creation order; `match_request` searches them in
//! that order.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{HttpRequest, HttpResponse};
use crate::store::StoreError;
use crate::utils::{encode_file_key, write_atomic_async};

const INDEX_FILE: &str = "index.json";

type Entries = BTreeMap<String, HttpResponse>;

pub struct CacheStorage {
    root: PathBuf,
    // Serializes read-modify-write cycles on the files
    lock: Mutex<()>,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_file_key(name)))
    }

    /// Names of all caches, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_index().await
    }

    /// Store one response.
    pub async fn put(&self, cache: &str, request: &HttpRequest, response: &HttpResponse) -> Result<(), StoreError> {
        self.put_all(cache, vec![(request.clone(), response.clone())]).await
    }

    /// Store several responses in one write: either all land or none do.
    pub async fn put_all(&self, cache: &str, entries: Vec<(HttpRequest, HttpResponse)>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.ensure_cache(cache).await?;

        let path = self.cache_path(cache);
        let mut stored: Entries = read_json(&path).await?.unwrap_or_default();
        for (request, response) in entries {
            stored.insert(request.cache_key(), response);
        }
        write_json(&path, &stored).await
    }

    /// Look a request up in one cache.
    pub async fn get(&self, cache: &str, request: &HttpRequest) -> Result<Option<HttpResponse>, StoreError> {
        let _guard = self.lock.lock().await;
        let stored: Option<Entries> = read_json(&self.cache_path(cache)).await?;
        Ok(stored.and_then(|mut entries| entries.remove(&request.cache_key())))
    }

    /// Look a request up across every cache.
    pub async fn match_request(&self, request: &HttpRequest) -> Result<Option<HttpResponse>, StoreError> {
        let _guard = self.lock.lock().await;
        let key = request.cache_key();
        for name in self.read_index().await? {
            let stored: Option<Entries> = read_json(&self.cache_path(&name)).await?;
            if let Some(response) = stored.and_then(|mut entries| entries.remove(&key)) {
                debug!(cache = %name, url = %request.url, "Cache hit");
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Delete a cache. Returns whether it existed.
    pub async fn delete(&self, cache: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|name| name != cache);
        if index.len() == before {
            return Ok(false);
        }

        match tokio::fs::remove_file(self.cache_path(cache)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        write_json(&self.root.join(INDEX_FILE), &index).await?;
        Ok(true)
    }

    async fn read_index(&self) -> Result<Vec<String>, StoreError> {
        Ok(read_json(&self.root.join(INDEX_FILE)).await?.unwrap_or_default())
    }

    async fn ensure_cache(&self, cache: &str) -> Result<(), StoreError> {
        let mut index = self.read_index().await?;
        if !index.iter().any(|name| name == cache) {
            index.push(cache.to_string());
            write_json(&self.root.join(INDEX_FILE), &index).await?;
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::ReadFailure(format!("{}: {}", path.display(), e))),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_json::to_vec(value)?;
    write_atomic_async(path, &contents)
        .await
        .map_err(|e| StoreError::WriteFailure(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str) -> HttpRequest {
        HttpRequest::get(url)
    }

    #[tokio::test]
    async fn test_put_get_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path().join("caches"));

        assert!(caches.keys().await.unwrap().is_empty());
        caches
            .put("shell-v1", &req("https://a/index.html"), &HttpResponse::new(200, "<html>"))
            .await
            .unwrap();
        caches
            .put("api-v1", &req("https://a/api"), &HttpResponse::new(200, "[]"))
            .await
            .unwrap();

        assert_eq!(caches.keys().await.unwrap(), vec!["shell-v1", "api-v1"]);
        let hit = caches.get("shell-v1", &req("https://a/index.html")).await.unwrap();
        assert_eq!(hit.map(|r| r.text()), Some("<html>".to_string()));
        assert!(caches.get("api-v1", &req("https://a/index.html")).await.unwrap().is_none());
        assert!(caches.get("missing", &req("https://a/index.html")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_searches_all_caches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let caches = CacheStorage::new(dir.path());
            caches
                .put("api-v1", &req("https://a/api"), &HttpResponse::new(200, "deck"))
                .await
                .unwrap();
        }

        let caches = CacheStorage::new(dir.path());
        let hit = caches.match_request(&req("https://a/api")).await.unwrap();
        assert_eq!(hit.map(|r| r.text()), Some("deck".to_string()));
        assert!(caches.match_request(&req("https://a/other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path());
        caches
            .put("old-v0", &req("https://a/app.js"), &HttpResponse::new(200, "old"))
            .await
            .unwrap();

        assert!(caches.delete("old-v0").await.unwrap());
        assert!(!caches.delete("old-v0").await.unwrap());
        assert!(caches.keys().await.unwrap().is_empty());
        assert!(caches.match_request(&req("https://a/app.js")).await.unwrap().is_none());
    }
}
