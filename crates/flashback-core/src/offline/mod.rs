//! Offline request interception.
//!
//! `OfflineProxy` sits between a client and the network as a `Transport`.
//! It has no view of application state; it only sees requests and the
//! response caches in `CacheStorage`:
//!
//! - deck API requests go network-first, falling back to the cached response
//! - other read-only requests go cache-first, filling the shell cache on a miss
//! - mutating requests pass straight through
//!
//! The proxy is installed (shell assets pre-cached), activated (caches of
//! other versions deleted) and then claims traffic.

pub mod proxy;
pub mod storage;

use thiserror::Error;

use crate::store::StoreError;

pub use proxy::{Interception, Lifecycle, OfflineProxy, ProxyConfig, API_CACHE, SHELL_CACHE};
pub use storage::CacheStorage;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Failed to fetch shell asset {url}: {reason}")]
    AssetFetch { url: String, reason: String },

    #[error("Cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: Lifecycle,
    },

    #[error("Cache storage error: {0}")]
    Storage(#[from] StoreError),
}
