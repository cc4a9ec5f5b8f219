//! The view state machine.
//!
//! `Viewer` owns the raw deck, the active (possibly shuffled) deck and the
//! position within it. Navigation only acts on a ready deck, and the
//! position is written to the preferences store after each change.

pub mod prefs;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::cache::DeckLoad;
use crate::models::Card;
use crate::utils::age_display;

pub use prefs::Preferences;

/// Where the viewer is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    /// Neither the network nor the store had a deck.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub index: usize,
    pub flipped: bool,
    pub shuffle: bool,
    /// The current deck came from storage rather than a fresh fetch.
    pub using_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

/// Everything a renderer needs to draw the current card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub text: String,
    pub position: String,
    pub face: Face,
    /// Banner text when showing stored data.
    pub banner: Option<String>,
}

/// Uniform random permutation (Fisher-Yates), returned as a new vector.
pub fn permute<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut copy = items.to_vec();
    for i in (1..copy.len()).rev() {
        let j = rng.gen_range(0..=i);
        copy.swap(i, j);
    }
    copy
}

pub struct Viewer {
    raw: Vec<Card>,
    active: Vec<Card>,
    state: ViewState,
    phase: Phase,
    saved_at: Option<DateTime<Utc>>,
    prefs: Preferences,
    rng: StdRng,
}

impl Viewer {
    pub fn new(prefs: Preferences) -> Self {
        Self::with_rng(prefs, StdRng::from_entropy())
    }

    /// Build a viewer with a specific shuffle source.
    pub fn with_rng(prefs: Preferences, rng: StdRng) -> Self {
        let state = ViewState {
            shuffle: prefs.shuffle(),
            ..ViewState::default()
        };
        Self {
            raw: Vec::new(),
            active: Vec::new(),
            state,
            phase: Phase::Loading,
            saved_at: None,
            prefs,
            rng,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn raw_deck(&self) -> &[Card] {
        &self.raw
    }

    pub fn active_deck(&self) -> &[Card] {
        &self.active
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.active.get(self.state.index)
    }

    /// Enter the loading phase and drop the stale-data banner.
    pub fn begin_loading(&mut self) {
        self.phase = Phase::Loading;
        self.state.using_cache = false;
        self.saved_at = None;
    }

    /// Replace the deck wholesale.
    ///
    /// With `use_saved_index` the persisted index (clamped to the deck) and
    /// flip state are restored; otherwise navigation restarts at the first
    /// card and the flip state is left alone.
    pub fn apply_deck(&mut self, deck: Vec<Card>, use_saved_index: bool) {
        self.active = if self.state.shuffle {
            permute(&deck, &mut self.rng)
        } else {
            deck.clone()
        };
        self.raw = deck;
        self.phase = Phase::Ready;

        let last = self.active.len().saturating_sub(1);
        if use_saved_index {
            self.state.index = self.prefs.index().min(last);
            self.state.flipped = self.prefs.flipped();
        } else {
            self.state.index = 0;
        }

        debug!(cards = self.active.len(), index = self.state.index, shuffle = self.state.shuffle, "Deck applied");
        self.render();
    }

    /// Apply the outcome of a deck load, restoring the saved position.
    pub fn apply_load(&mut self, load: DeckLoad) {
        match load {
            DeckLoad::Fresh(deck) => {
                self.state.using_cache = false;
                self.saved_at = None;
                self.apply_deck(deck, true);
            }
            DeckLoad::Cached { deck, saved_at } => {
                self.state.using_cache = true;
                self.saved_at = saved_at;
                self.apply_deck(deck, true);
            }
            DeckLoad::Unavailable => self.mark_unavailable(),
        }
    }

    /// Terminal state after a load found no deck anywhere.
    pub fn mark_unavailable(&mut self) {
        self.raw.clear();
        self.active.clear();
        self.state.index = 0;
        self.state.using_cache = false;
        self.saved_at = None;
        self.phase = Phase::Unavailable;
    }

    /// Re-derive the active deck from the raw deck, starting at the first card.
    /// Only a ready viewer restarts; loading and unavailable are left as is.
    pub fn restart(&mut self) {
        if self.phase != Phase::Ready {
            return;
        }
        let deck = self.raw.clone();
        self.apply_deck(deck, false);
    }

    fn navigable(&self) -> bool {
        self.phase == Phase::Ready && !self.active.is_empty()
    }

    pub fn next(&mut self) {
        let len = self.active.len();
        if !self.navigable() {
            return;
        }
        self.state.index = (self.state.index + 1) % len;
        self.state.flipped = false;
        self.render();
    }

    pub fn prev(&mut self) {
        let len = self.active.len();
        if !self.navigable() {
            return;
        }
        self.state.index = (self.state.index + len - 1) % len;
        self.state.flipped = false;
        self.render();
    }

    pub fn flip(&mut self) {
        if !self.navigable() {
            return;
        }
        self.state.flipped = !self.state.flipped;
        self.render();
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.state.shuffle = shuffle;
        self.prefs.save_shuffle(shuffle);
        self.restart();
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.state.shuffle);
    }

    pub fn view(&self) -> CardView {
        let banner = self.state.using_cache.then(|| match self.saved_at {
            Some(at) => format!("Offline: showing cached deck from {}", age_display(at)),
            None => "Offline: showing cached deck".to_string(),
        });
        let face = if self.state.flipped && !self.active.is_empty() {
            Face::Back
        } else {
            Face::Front
        };

        let text = match (self.phase, self.current_card()) {
            (Phase::Loading, _) => "Loading…".to_string(),
            (Phase::Unavailable, _) => "Unable to load deck".to_string(),
            (Phase::Ready, None) => "No cards available".to_string(),
            (Phase::Ready, Some(card)) => card.face(self.state.flipped).to_string(),
        };
        let position = match self.current_card() {
            Some(_) => format!("Card {} / {}", self.state.index + 1, self.active.len()),
            None => "Card 0 / 0".to_string(),
        };

        CardView {
            text,
            position,
            face,
            banner,
        }
    }

    fn render(&mut self) {
        if !self.active.is_empty() {
            self.prefs.save_position(self.state.index, self.state.flipped);
        }
    }
}
