use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::api::{ApiError, HttpRequest, HttpResponse, Transport};

use super::{CacheStorage, ProxyError};

/// Cache holding the static shell.
pub const SHELL_CACHE: &str = "flashback-shell-v1";

/// Cache holding deck API responses.
pub const API_CACHE: &str = "flashback-api-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not yet serving; install may be running or may have failed.
    Installing,
    /// Activated, old caches collected, not yet claiming requests.
    Active,
    /// Handling every request routed through it.
    Intercepting,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Substring of the URL that marks a deck API request.
    pub api_marker: String,
    /// Base URL the shell assets are resolved against.
    pub shell_origin: Option<String>,
    pub shell_assets: Vec<String>,
}

/// What the proxy decided to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    Respond(HttpResponse),
    /// Not handled; the request should go to the network untouched.
    Passthrough,
}

#[derive(Debug)]
struct Status {
    lifecycle: Lifecycle,
    installed: bool,
}

pub struct OfflineProxy<T> {
    network: T,
    caches: CacheStorage,
    config: ProxyConfig,
    status: Mutex<Status>,
}

impl<T: Transport> OfflineProxy<T> {
    pub fn new(network: T, caches: CacheStorage, config: ProxyConfig) -> Self {
        Self {
            network,
            caches,
            config,
            status: Mutex::new(Status {
                lifecycle: Lifecycle::Installing,
                installed: false,
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .lifecycle
    }

    fn update<R>(&self, f: impl FnOnce(&mut Status) -> R) -> R {
        let mut status = self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut status)
    }

    /// Install, activate and claim in one go.
    pub async fn start(&self) -> Result<(), ProxyError> {
        self.install().await?;
        self.activate().await?;
        self.claim()
    }

    /// Pre-cache every shell asset. All assets are stored or none are.
    pub async fn install(&self) -> Result<(), ProxyError> {
        let state = self.lifecycle();
        if state != Lifecycle::Installing {
            return Err(ProxyError::InvalidState {
                action: "install",
                state,
            });
        }

        let requests = self.shell_requests()?;
        let count = requests.len();
        if count > 0 {
            let responses =
                try_join_all(requests.iter().map(|request| self.fetch_asset(request))).await?;
            self.caches
                .put_all(SHELL_CACHE, requests.into_iter().zip(responses).collect())
                .await?;
        }

        self.update(|s| s.installed = true);
        info!(assets = count, "Shell cached");
        Ok(())
    }

    /// Delete caches from other versions. Takes over immediately, without
    /// waiting for older instances.
    pub async fn activate(&self) -> Result<(), ProxyError> {
        let (state, installed) = self.update(|s| (s.lifecycle, s.installed));
        if state != Lifecycle::Installing || !installed {
            return Err(ProxyError::InvalidState {
                action: "activate",
                state,
            });
        }

        for name in self.caches.keys().await? {
            if name != SHELL_CACHE && name != API_CACHE {
                info!(cache = %name, "Deleting outdated cache");
                self.caches.delete(&name).await?;
            }
        }

        self.update(|s| s.lifecycle = Lifecycle::Active);
        Ok(())
    }

    /// Start intercepting requests.
    pub fn claim(&self) -> Result<(), ProxyError> {
        self.update(|s| match s.lifecycle {
            Lifecycle::Active => {
                s.lifecycle = Lifecycle::Intercepting;
                Ok(())
            }
            state => Err(ProxyError::InvalidState {
                action: "claim",
                state,
            }),
        })
    }

    /// Decide how to answer a request.
    pub async fn handle(&self, request: &HttpRequest) -> Result<Interception, ApiError> {
        if self.lifecycle() != Lifecycle::Intercepting {
            return Ok(Interception::Passthrough);
        }

        if request.url.contains(&self.config.api_marker) {
            return self.network_first(request).await.map(Interception::Respond);
        }

        if !request.is_read_only() {
            return Ok(Interception::Passthrough);
        }

        self.cache_first(request).await.map(Interception::Respond)
    }

    async fn network_first(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(API_CACHE, request, &response).await;
                Ok(response)
            }
            Err(e) => match self.caches.match_request(request).await {
                Ok(Some(cached)) => {
                    info!(url = %request.url, error = %e, "Network failed, serving cached API response");
                    Ok(cached)
                }
                Ok(None) => Err(e),
                Err(cache_err) => {
                    warn!(error = %cache_err, "Cache lookup failed");
                    Err(e)
                }
            },
        }
    }

    async fn cache_first(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match self.caches.match_request(request).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cache lookup failed"),
        }

        let response = self.network.fetch(request).await?;
        self.store(SHELL_CACHE, request, &response).await;
        Ok(response)
    }

    /// Best-effort cache write. The caller gets its response regardless.
    async fn store(&self, cache: &str, request: &HttpRequest, response: &HttpResponse) {
        if !response.is_success() {
            debug!(url = %request.url, status = response.status, "Not caching unsuccessful response");
            return;
        }
        if let Err(e) = self.caches.put(cache, request, response).await {
            warn!(cache, url = %request.url, error = %e, "Failed to cache response");
        }
    }

    fn shell_requests(&self) -> Result<Vec<HttpRequest>, ProxyError> {
        let Some(ref origin) = self.config.shell_origin else {
            return Ok(Vec::new());
        };
        let base = Url::parse(origin).map_err(|e| ProxyError::AssetFetch {
            url: origin.clone(),
            reason: e.to_string(),
        })?;

        self.config
            .shell_assets
            .iter()
            .map(|asset| {
                base.join(asset)
                    .map(|url| HttpRequest::get(url.as_str()))
                    .map_err(|e| ProxyError::AssetFetch {
                        url: asset.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    async fn fetch_asset(&self, request: &HttpRequest) -> Result<HttpResponse, ProxyError> {
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| ProxyError::AssetFetch {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(ProxyError::AssetFetch {
                url: request.url.clone(),
                reason: format!("status {}", response.status),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl<T: Transport> Transport for OfflineProxy<T> {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match self.handle(request).await? {
            Interception::Respond(response) => Ok(response),
            Interception::Passthrough => self.network.fetch(request).await,
        }
    }
}
