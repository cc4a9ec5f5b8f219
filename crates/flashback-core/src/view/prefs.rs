use std::sync::Arc;

use crate::store::LocalStore;

pub const INDEX_KEY: &str = "flashback:index";
pub const FLIPPED_KEY: &str = "flashback:flipped";
pub const SHUFFLE_KEY: &str = "flashback:shuffle";

/// View preferences kept in the synchronous store. Best-effort both ways.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<LocalStore>,
}

impl Preferences {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn index(&self) -> usize {
        self.store.get(INDEX_KEY, 0)
    }

    pub fn flipped(&self) -> bool {
        self.store.get(FLIPPED_KEY, false)
    }

    pub fn shuffle(&self) -> bool {
        self.store.get(SHUFFLE_KEY, false)
    }

    pub fn save_position(&self, index: usize, flipped: bool) {
        self.store.set(INDEX_KEY, &index);
        self.store.set(FLIPPED_KEY, &flipped);
    }

    pub fn save_shuffle(&self, shuffle: bool) {
        self.store.set(SHUFFLE_KEY, &shuffle);
    }
}
