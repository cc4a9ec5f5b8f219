//! Deck endpoint client module.
//!
//! This module provides the `DeckClient` for fetching the flashcard deck,
//! the `Transport` seam it issues requests through, and `HttpTransport`,
//! the reqwest-backed transport. The offline proxy in `crate::offline`
//! is also a `Transport`, which is how it intercepts the client's calls.

pub mod client;
pub mod error;
pub mod transport;

pub use client::DeckClient;
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
