//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the deck endpoint, the request timeout, the static shell to pre-cache,
//! and an optional override of where data is stored.
//!
//! Configuration is stored at `~/.config/flashback/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::offline::ProxyConfig;

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "flashback";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the deck endpoint
pub const DECK_URL_ENV: &str = "FLASHBACK_DECK_URL";

const DEFAULT_DECK_URL: &str =
    "https://5ecvq3d6ri.execute-api.eu-west-2.amazonaws.com/api/sheet/hanzi/realities";

const DEFAULT_API_MARKER: &str = "/api/sheet/hanzi/realities";

/// 30s allows for slow responses while never hanging a load forever.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_SHELL_ASSETS: &[&str] = &[
    "./",
    "index.html",
    "styles.css",
    "app.js",
    "manifest.webmanifest",
    "icons/icon-192.svg",
    "icons/icon-512.svg",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deck_url: String,
    pub api_path_marker: String,
    pub request_timeout_secs: u64,
    pub shell_origin: Option<String>,
    pub shell_assets: Vec<String>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_url: DEFAULT_DECK_URL.to_string(),
            api_path_marker: DEFAULT_API_MARKER.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shell_origin: None,
            shell_assets: DEFAULT_SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DECK_URL_ENV) {
            if !url.trim().is_empty() {
                self.deck_url = url.trim().to_string();
            }
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root of the durable stores. `None` when the platform has no data
    /// directory, in which case storage falls back to memory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_NAME)))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            api_marker: self.api_path_marker.clone(),
            shell_origin: self.shell_origin.clone(),
            shell_assets: self.shell_assets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"request_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.deck_url, DEFAULT_DECK_URL);
        assert_eq!(config.shell_assets.len(), 7);
        assert!(config.shell_origin.is_none());
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_data_dir_override() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/flashback-test")),
            ..Config::default()
        };
        assert_eq!(config.data_dir(), Some(PathBuf::from("/tmp/flashback-test")));
    }

    #[test]
    fn test_proxy_config_carries_marker() {
        let proxy = Config::default().proxy_config();
        assert_eq!(proxy.api_marker, DEFAULT_API_MARKER);
        assert!(Config::default().deck_url.contains(&proxy.api_marker));
    }
}
