//! Client for the remote deck endpoint.

use std::sync::Arc;

use tracing::debug;

use crate::models::{normalize_deck, Card};

use super::{ApiError, HttpRequest, Transport};

/// Fetches and normalizes the deck. Clone is cheap.
#[derive(Clone)]
pub struct DeckClient {
    transport: Arc<dyn Transport>,
    deck_url: String,
}

impl DeckClient {
    pub fn new(transport: Arc<dyn Transport>, deck_url: impl Into<String>) -> Self {
        Self {
            transport,
            deck_url: deck_url.into(),
        }
    }

    /// Fetch the deck. Fails on transport errors, non-success statuses,
    /// unparseable bodies and decks that normalize to zero cards.
    pub async fn fetch_deck(&self) -> Result<Vec<Card>, ApiError> {
        let response = self
            .transport
            .fetch(&HttpRequest::get(&self.deck_url))
            .await?;

        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.text()));
        }

        let data: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
        let deck = normalize_deck(data).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;

        if deck.is_empty() {
            return Err(ApiError::EmptyDeck);
        }

        debug!(cards = deck.len(), "Fetched deck");
        Ok(deck)
    }
}
