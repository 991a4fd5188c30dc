//! Identity key -> position maps for O(1) upsert into ordered vectors.

use std::collections::HashMap;
use std::hash::Hash;

/// Maps a record's identity key to its index in a backing `Vec`.
///
/// The owner is responsible for calling [`KeyIndex::rebuild`] whenever
/// positions shift (removal or re-sorting).
#[derive(Debug, Clone)]
pub struct KeyIndex<K> {
    positions: HashMap<K, usize>,
}

impl<K: Hash + Eq> KeyIndex<K> {
    /// Create a new, empty index.
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
        }
    }

    /// Position of `key`, if indexed.
    pub fn get<Q>(&self, key: &Q) -> Option<usize>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(key).copied()
    }

    /// Record that `key` lives at `position`.
    pub fn insert(&mut self, key: K, position: usize) {
        self.positions.insert(key, position);
    }

    /// Rebuild the entire index from a slice of records.
    pub fn rebuild<T>(&mut self, items: &[T], key_of: impl Fn(&T) -> K) {
        self.positions.clear();
        self.positions.reserve(items.len());
        for (i, item) in items.iter().enumerate() {
            self.positions.insert(key_of(item), i);
        }
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<K: Hash + Eq> Default for KeyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
