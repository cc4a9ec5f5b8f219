//! Application state for the Flashback terminal front-end.
//!
//! `App` is the context object created once at startup: it wires the
//! configuration, the durable store, the offline proxy and the deck cache
//! together, and owns the `Viewer` the renderer reads from. Deck loads run
//! on a background task and report back over a channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use flashback_core::api::{DeckClient, HttpTransport};
use flashback_core::offline::{CacheStorage, OfflineProxy};
use flashback_core::store::DurableStore;
use flashback_core::view::Preferences;
use flashback_core::{Config, DeckCache, DeckLoad, Viewer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffer size for the background load channel.
/// Only one load runs at a time, so a small buffer is plenty.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

/// User intents, whatever gesture produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Prev,
    Flip,
    ToggleShuffle,
    Reload,
    ToggleHelp,
    Quit,
}

/// Result of a background load.
struct LoadMessage {
    load: DeckLoad,
    /// Reload semantics: land on the first card afterwards.
    restart: bool,
}

pub struct App {
    pub view: Viewer,
    deck_cache: DeckCache,

    pub state: AppState,
    pub loading: bool,
    /// Whether the last load reached the network. Unknown before the first load.
    pub online: Option<bool>,
    pub status_message: Option<String>,

    load_tx: mpsc::Sender<LoadMessage>,
    load_rx: mpsc::Receiver<LoadMessage>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir();
        if data_dir.is_none() {
            warn!("No data directory available, deck will not survive restarts");
        }
        let (store, local) = DurableStore::open(data_dir.as_deref());

        let cache_root = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"))
            .join("caches");
        let network = HttpTransport::new(config.request_timeout())?;
        let proxy = Arc::new(OfflineProxy::new(
            network,
            CacheStorage::new(cache_root),
            config.proxy_config(),
        ));
        if let Err(e) = proxy.start().await {
            // Requests pass straight through until a later start succeeds
            warn!(error = %e, "Offline proxy failed to start");
        }

        let client = DeckClient::new(proxy, config.deck_url);
        let deck_cache = DeckCache::new(client, Arc::new(store));
        let view = Viewer::new(Preferences::new(local));

        let (load_tx, load_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            view,
            deck_cache,
            state: AppState::Normal,
            loading: false,
            online: None,
            status_message: None,
            load_tx,
            load_rx,
        })
    }

    /// Kick off a deck load in the background. Ignored while one is running.
    pub fn start_load(&mut self, restart: bool) {
        if self.loading {
            self.status_message = Some("Already loading…".to_string());
            return;
        }
        self.loading = true;
        self.status_message = None;
        self.view.begin_loading();

        let deck_cache = self.deck_cache.clone();
        let tx = self.load_tx.clone();
        tokio::spawn(async move {
            let load = deck_cache.fetch().await;
            if tx.send(LoadMessage { load, restart }).await.is_err() {
                debug!("Load finished after the app shut down");
            }
        });
    }

    /// Apply any finished background loads.
    pub fn check_background_tasks(&mut self) {
        while let Ok(message) = self.load_rx.try_recv() {
            self.finish_load(message);
        }
    }

    fn finish_load(&mut self, message: LoadMessage) {
        self.loading = false;
        self.online = Some(message.load.is_fresh());
        if matches!(message.load, DeckLoad::Unavailable) {
            self.status_message = Some("Press r to try again".to_string());
        }
        self.view.apply_load(message.load);
        if message.restart {
            self.view.restart();
        }
        info!(cards = self.view.active_deck().len(), using_cache = self.view.state().using_cache, "Deck ready");
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Next => self.view.next(),
            Action::Prev => self.view.prev(),
            Action::Flip => self.view.flip(),
            Action::ToggleShuffle => self.view.toggle_shuffle(),
            Action::Reload => self.start_load(true),
            Action::ToggleHelp => {
                self.state = match self.state {
                    AppState::ShowingHelp => AppState::Normal,
                    _ => AppState::ShowingHelp,
                };
            }
            Action::Quit => self.state = AppState::Quitting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn offline_app(dir: &std::path::Path) -> App {
        let config = Config {
            deck_url: "http://127.0.0.1:9/api/sheet/hanzi/realities".to_string(),
            data_dir: Some(dir.to_path_buf()),
            request_timeout_secs: 2,
            ..Config::default()
        };
        App::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_finish_load_applies_deck_and_online_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app(dir.path()).await;

        app.loading = true;
        app.finish_load(LoadMessage {
            load: DeckLoad::Fresh(vec![
                flashback_core::Card::new("猫", "cat"),
                flashback_core::Card::new("狗", "dog"),
            ]),
            restart: false,
        });
        assert!(!app.loading);
        assert_eq!(app.online, Some(true));
        assert_eq!(app.view.view().text, "猫");

        app.apply(Action::Next);
        app.apply(Action::Flip);
        assert_eq!(app.view.view().text, "dog");

        app.finish_load(LoadMessage {
            load: DeckLoad::Cached {
                deck: vec![flashback_core::Card::new("猫", "cat"), flashback_core::Card::new("狗", "dog")],
                saved_at: None,
            },
            restart: true,
        });
        assert_eq!(app.online, Some(false));
        assert_eq!(app.view.state().index, 0);
        assert!(app.view.view().banner.is_some());
    }

    #[tokio::test]
    async fn test_restart_after_unavailable_load_keeps_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app(dir.path()).await;

        app.loading = true;
        app.finish_load(LoadMessage {
            load: DeckLoad::Unavailable,
            restart: true,
        });
        assert_eq!(app.online, Some(false));
        assert_eq!(app.view.view().text, "Unable to load deck");
        assert_eq!(app.status_message.as_deref(), Some("Press r to try again"));
    }

    #[tokio::test]
    async fn test_load_while_loading_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app(dir.path()).await;

        app.loading = true;
        app.start_load(false);
        assert_eq!(app.status_message.as_deref(), Some("Already loading…"));
    }

    #[tokio::test]
    async fn test_help_toggles_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app(dir.path()).await;

        app.apply(Action::ToggleHelp);
        assert_eq!(app.state, AppState::ShowingHelp);
        app.apply(Action::ToggleHelp);
        assert_eq!(app.state, AppState::Normal);
        app.apply(Action::Quit);
        assert_eq!(app.state, AppState::Quitting);
    }
}
