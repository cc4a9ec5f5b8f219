use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::{ApiError, DeckClient};
use crate::models::Card;
use crate::store::DurableStore;
use crate::view::Viewer;

/// The single key the last good deck is stored under.
pub const DECK_KEY: &str = "latest";

/// When the stored deck was written.
pub const SAVED_AT_KEY: &str = "latest:saved_at";

/// Outcome of one load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckLoad {
    /// Fetched from the network (and stored).
    Fresh(Vec<Card>),
    /// The network failed; this is the last stored deck.
    Cached {
        deck: Vec<Card>,
        saved_at: Option<DateTime<Utc>>,
    },
    /// The network failed and nothing usable was stored.
    Unavailable,
}

impl DeckLoad {
    pub fn is_fresh(&self) -> bool {
        matches!(self, DeckLoad::Fresh(_))
    }
}

/// Network-first deck loader with a durable fallback. Clone is cheap.
#[derive(Clone)]
pub struct DeckCache {
    client: DeckClient,
    store: Arc<DurableStore>,
}

impl DeckCache {
    pub fn new(client: DeckClient, store: Arc<DurableStore>) -> Self {
        Self { client, store }
    }

    /// Fetch the deck, falling back to the stored copy. Never fails.
    pub async fn fetch(&self) -> DeckLoad {
        match self.client.fetch_deck().await {
            Ok(deck) => {
                self.remember(&deck).await;
                info!(cards = deck.len(), "Loaded fresh deck");
                DeckLoad::Fresh(deck)
            }
            Err(e) => {
                log_fetch_failure(&e);
                self.stored().await
            }
        }
    }

    /// Full load: mark the viewer loading, fetch, apply with the saved position.
    pub async fn load(&self, view: &mut Viewer) -> DeckLoad {
        view.begin_loading();
        let load = self.fetch().await;
        view.apply_load(load.clone());
        load
    }

    /// A load that always lands on the first card of the (re-derived) deck.
    pub async fn reload(&self, view: &mut Viewer) -> DeckLoad {
        let load = self.load(view).await;
        view.restart();
        load
    }

    async fn remember(&self, deck: &[Card]) {
        if let Err(e) = self.store.put(DECK_KEY, deck).await {
            warn!(error = %e, "Failed to store deck for offline use");
            return;
        }
        if let Err(e) = self.store.put(SAVED_AT_KEY, &Utc::now()).await {
            debug!(error = %e, "Failed to record deck save time");
        }
    }

    async fn stored(&self) -> DeckLoad {
        let deck: Vec<Card> = self.store.get_or(DECK_KEY, Vec::new()).await;
        if deck.is_empty() {
            warn!("No stored deck to fall back to");
            return DeckLoad::Unavailable;
        }

        let saved_at = self.store.get_or(SAVED_AT_KEY, None).await;
        info!(cards = deck.len(), "Using stored deck");
        DeckLoad::Cached { deck, saved_at }
    }
}

fn log_fetch_failure(error: &ApiError) {
    if error.is_network() {
        warn!(error = %error, "Deck fetch failed, falling back to stored deck");
    } else {
        warn!(error = %error, "Deck payload unusable, falling back to stored deck");
    }
}
