//! Data models for flashcard decks.
//!
//! - `Card`: a front/back text pair, extra fields passed through untouched
//! - `normalize_deck`: accepts a bare array or an `{ "items": [...] }` wrapper

pub mod card;

pub use card::{normalize_deck, Card};
