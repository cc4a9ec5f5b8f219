//! Core library for Flashback, an offline-capable flashcard viewer.
//!
//! - `api`: deck endpoint client and the HTTP `Transport` seam
//! - `store`: durable key-value storage with ranked fallback backends
//! - `cache`: the deck cache manager (network first, stored deck on failure)
//! - `view`: navigation/flip/shuffle state machine with persisted position
//! - `offline`: request interception layer serving cached responses offline
//! - `config`: user configuration and storage locations

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod offline;
pub mod store;
pub mod utils;
pub mod view;

#[cfg(test)]
mod testing;

pub use cache::{DeckCache, DeckLoad};
pub use config::Config;
pub use models::Card;
pub use view::{Phase, ViewState, Viewer};
