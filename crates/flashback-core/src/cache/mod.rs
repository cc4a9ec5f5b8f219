//! Deck caching for offline use.
//!
//! This module provides the `DeckCache`, which fetches the deck from the
//! network, stores every good deck in the durable store, and falls back
//! to the last stored deck when the network (or the payload) fails.

pub mod manager;

pub use manager::{DeckCache, DeckLoad, DECK_KEY, SAVED_AT_KEY};
