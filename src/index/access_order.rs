//! LRU order index: logical access ticks mapped to cache keys.

use std::collections::{BTreeMap, HashMap};

/// Tracks recency of cache keys. Every touch moves a key to the newest end;
/// the smallest tick is the least recently used key.
///
/// Ticks are a logical counter rather than wall time, so two touches in the
/// same millisecond still have a strict order.
#[derive(Debug, Default)]
pub struct AccessOrder {
    /// Sorted by tick ascending (oldest first).
    by_tick: BTreeMap<u64, String>,
    by_key: HashMap<String, u64>,
    next_tick: u64,
}

impl AccessOrder {
    /// Create a new, empty order index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from keys listed oldest first.
    pub fn from_oldest_first<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order = Self::new();
        for key in keys {
            order.touch(&key.into());
        }
        order
    }

    /// Mark `key` as the most recently used.
    pub fn touch(&mut self, key: &str) {
        if let Some(old) = self.by_key.get(key).copied() {
            self.by_tick.remove(&old);
        }
        let tick = self.next_tick;
        self.next_tick += 1;
        self.by_tick.insert(tick, key.to_string());
        self.by_key.insert(key.to_string(), tick);
    }

    /// Forget `key`. Returns whether it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.by_key.remove(key) {
            Some(tick) => {
                self.by_tick.remove(&tick);
                true
            }
            None => false,
        }
    }

    /// The least recently used key.
    pub fn oldest(&self) -> Option<&str> {
        self.by_tick.values().next().map(String::as_str)
    }

    /// Keys from least to most recently used.
    pub fn oldest_first(&self) -> impl Iterator<Item = &str> {
        self.by_tick.values().map(String::as_str)
    }

    /// Whether `key` is tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.by_tick.clear();
        self.by_key.clear();
        self.next_tick = 0;
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
