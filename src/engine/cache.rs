//! Content-addressed analysis cache with LRU, TTL and size-bounded eviction.

use std::collections::HashMap;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::format::{ByteStore, CacheSnapshot};
use crate::index::AccessOrder;
use crate::types::{Analyzed, CacheEntry, CacheStats, Clock, SmemResult, SystemClock};

/// Where a persistent cache mirrors itself.
struct Persistence {
    store: Box<dyn ByteStore>,
    key: String,
}

/// Outcome of checking one entry against the presented content.
enum Lookup {
    Absent,
    ContentChanged,
    Expired,
    Fresh,
}

/// Cache of analysis results keyed by the text that was analyzed.
///
/// Lookup keys come from a cheap rolling hash, so two texts can share a
/// key. Each entry also stores the SHA-256 of its content and `get` refuses
/// (and drops) an entry whose hash differs from the content presented.
pub struct ContentCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: AccessOrder,
    /// Sum of `size_bytes` over `entries`.
    total_size: usize,
    hits: u64,
    misses: u64,
    config: CacheConfig,
    clock: Box<dyn Clock>,
    persistence: Option<Persistence>,
}

impl<T> ContentCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Create an in-memory cache on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create an in-memory cache from validated configuration.
    pub fn with_config(config: CacheConfig) -> SmemResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create an in-memory cache on a custom clock. Limits of 0 are raised
    /// to 1.
    pub fn with_clock(mut config: CacheConfig, clock: impl Clock + 'static) -> Self {
        config.max_entries = config.max_entries.max(1);
        config.max_size_bytes = config.max_size_bytes.max(1);
        Self {
            entries: HashMap::new(),
            order: AccessOrder::new(),
            total_size: 0,
            hits: 0,
            misses: 0,
            config,
            clock: Box::new(clock),
            persistence: None,
        }
    }

    /// Create a cache mirrored into `store` under `key`.
    ///
    /// When `config.persistence` is off the store is ignored. Otherwise any
    /// snapshot already under `key` is loaded; an unreadable or malformed
    /// snapshot is logged and the cache starts empty.
    pub fn with_store(
        config: CacheConfig,
        clock: impl Clock + 'static,
        store: Box<dyn ByteStore>,
        key: impl Into<String>,
    ) -> Self {
        let mut cache = Self::with_clock(config, clock);
        if !cache.config.persistence {
            log::debug!("Cache persistence disabled; byte store not attached");
            return cache;
        }
        let key = key.into();
        match store.read(&key) {
            Ok(Some(bytes)) => {
                if let Err(e) = cache.import_snapshot(&bytes) {
                    log::warn!("Discarding persisted cache {key}: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read persisted cache {key}: {e}"),
        }
        cache.persistence = Some(Persistence { store, key });
        cache
    }

    /// Lookup key for `content` in namespace `prefix`.
    ///
    /// Deterministic; any edit to `content` changes the key with high
    /// probability. Collisions are tolerated because `get` re-checks the
    /// full content hash.
    pub fn key_for(prefix: &str, content: &str) -> String {
        format!(
            "{}_{}_{}",
            prefix,
            to_base36(rolling_hash(content)),
            content.len()
        )
    }

    /// Hex SHA-256 of `content`.
    pub fn content_hash(content: &str) -> String {
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    /// Look up `key`, valid only if it was stored against `current_content`
    /// and has not outlived the TTL. A stale entry is deleted on the spot.
    pub fn get(&mut self, key: &str, current_content: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let lookup = match self.entries.get(key) {
            None => Lookup::Absent,
            Some(e) if e.content_hash != Self::content_hash(current_content) => {
                Lookup::ContentChanged
            }
            Some(e) if self.is_expired(e, now) => Lookup::Expired,
            Some(_) => Lookup::Fresh,
        };

        match lookup {
            Lookup::Absent => {
                self.misses += 1;
                None
            }
            Lookup::ContentChanged => {
                self.invalidate(key, "content changed");
                None
            }
            Lookup::Expired => {
                self.invalidate(key, "expired");
                None
            }
            Lookup::Fresh => {
                let entry = self.entries.get_mut(key)?;
                entry.last_accessed_at = now;
                entry.access_count = entry.access_count.saturating_add(1);
                let value = entry.value.clone();
                self.order.touch(key);
                self.hits += 1;
                Some(value)
            }
        }
    }

    /// Store `value` as the analysis of `content` under `key`, evicting
    /// least recently used entries until it fits.
    ///
    /// Returns false when the value alone exceeds the size budget; it is
    /// then not cached and any previous entry under `key` is dropped.
    pub fn set(&mut self, key: &str, value: T, content: &str) -> bool {
        let size_bytes = estimate_size(key, &value);
        self.remove_entry(key);

        if size_bytes > self.config.max_size_bytes {
            log::debug!(
                "Not caching {key}: {size_bytes} bytes exceeds budget of {}",
                self.config.max_size_bytes
            );
            self.persist();
            return false;
        }

        while !self.entries.is_empty()
            && (self.total_size + size_bytes > self.config.max_size_bytes
                || self.entries.len() >= self.config.max_entries)
        {
            if self.evict_oldest().is_none() {
                break;
            }
        }

        let now = self.clock.now_millis();
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            content_hash: Self::content_hash(content),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            size_bytes,
        };
        self.insert_entry(entry);
        self.persist();
        true
    }

    /// Whether `key` is present and within its TTL. Content is not checked.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        self.entries
            .get(key)
            .is_some_and(|e| !self.is_expired(e, now))
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Drop every entry and reset the hit/miss counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_size = 0;
        self.hits = 0;
        self.misses = 0;
        self.persist();
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn clean_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| self.is_expired(e, now))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
        }
        if !expired.is_empty() {
            log::debug!("Swept {} expired cache entries", expired.len());
            self.persist();
        }
        expired.len()
    }

    /// Current counters. Size and timestamps are derived from live entries.
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        };
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            total_size: self.entries.values().map(|e| e.size_bytes).sum(),
            total_entries: self.entries.len(),
            oldest_entry: self.entries.values().map(|e| e.created_at).min(),
            newest_entry: self.entries.values().map(|e| e.created_at).max(),
        }
    }

    /// Zero the hit/miss counters without touching entries.
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active limits.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached analysis of `content` or compute, store and return
    /// it. `analyze` runs only on a miss.
    pub fn get_or_analyze<F>(&mut self, prefix: &str, content: &str, analyze: F) -> Analyzed<T>
    where
        F: FnOnce(&str) -> T,
    {
        let started = Instant::now();
        let key = Self::key_for(prefix, content);
        if let Some(value) = self.get(&key, content) {
            return Analyzed {
                value,
                from_cache: true,
                elapsed: started.elapsed(),
            };
        }
        let value = analyze(content);
        self.set(&key, value.clone(), content);
        Analyzed {
            value,
            from_cache: false,
            elapsed: started.elapsed(),
        }
    }

    /// Fallible variant of [`get_or_analyze`](Self::get_or_analyze). Errors
    /// are passed through and never cached.
    pub fn try_get_or_analyze<F, E>(
        &mut self,
        prefix: &str,
        content: &str,
        analyze: F,
    ) -> Result<Analyzed<T>, E>
    where
        F: FnOnce(&str) -> Result<T, E>,
    {
        let started = Instant::now();
        let key = Self::key_for(prefix, content);
        if let Some(value) = self.get(&key, content) {
            return Ok(Analyzed {
                value,
                from_cache: true,
                elapsed: started.elapsed(),
            });
        }
        let value = analyze(content)?;
        self.set(&key, value.clone(), content);
        Ok(Analyzed {
            value,
            from_cache: false,
            elapsed: started.elapsed(),
        })
    }

    /// Wrap an analyzer so repeated calls on the same text are served from
    /// this cache. The analyzer runs once per distinct `(prefix, content)`
    /// until that entry is evicted or expires.
    pub fn with_cache<'a, F>(
        &'a mut self,
        prefix: &'a str,
        mut analyze: F,
    ) -> impl FnMut(&str) -> Analyzed<T> + 'a
    where
        F: FnMut(&str) -> T + 'a,
        T: 'a,
    {
        move |content: &str| self.get_or_analyze(prefix, content, &mut analyze)
    }

    /// Encode every entry, least recently used first, plus the counters.
    pub fn export_snapshot(&self) -> SmemResult<Vec<u8>> {
        let entries: Vec<CacheEntry<T>> = self
            .order
            .oldest_first()
            .filter_map(|k| self.entries.get(k).cloned())
            .collect();
        CacheSnapshot::new(entries, self.hits, self.misses).to_bytes()
    }

    /// Replace all state with a decoded snapshot. Nothing changes if the
    /// snapshot is malformed. Entries beyond the current limits are evicted
    /// oldest first.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> SmemResult<()> {
        let snapshot: CacheSnapshot<T> = CacheSnapshot::parse_bytes(bytes)?;
        self.entries.clear();
        self.order.clear();
        self.total_size = 0;
        self.hits = snapshot.hits;
        self.misses = snapshot.misses;
        for entry in snapshot.entries {
            self.insert_entry(entry);
        }
        while self.total_size > self.config.max_size_bytes
            || self.entries.len() > self.config.max_entries
        {
            if self.evict_oldest().is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Write the current state to the attached byte store. Access metadata
    /// recorded by `get` is otherwise only persisted with the next mutation.
    pub fn flush(&mut self) -> bool {
        if self.persistence.is_none() {
            return false;
        }
        self.persist()
    }

    fn invalidate(&mut self, key: &str, reason: &str) {
        log::debug!("Cache entry {key} invalidated: {reason}");
        self.remove_entry(key);
        self.misses += 1;
        self.persist();
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: u64) -> bool {
        match self.config.ttl_millis() {
            Some(ttl) => now.saturating_sub(entry.created_at) >= ttl,
            None => false,
        }
    }

    fn insert_entry(&mut self, entry: CacheEntry<T>) {
        self.order.touch(&entry.key);
        self.total_size += entry.size_bytes;
        if let Some(old) = self.entries.insert(entry.key.clone(), entry) {
            self.total_size = self.total_size.saturating_sub(old.size_bytes);
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(key);
        self.total_size = self.total_size.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let key = self.order.oldest()?.to_string();
        self.remove_entry(&key);
        log::debug!("Evicted least recently used cache entry {key}");
        Some(key)
    }

    /// Best-effort write; failures are logged, never surfaced.
    fn persist(&mut self) -> bool {
        if self.persistence.is_none() {
            return false;
        }
        let bytes = match self.export_snapshot() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to encode cache snapshot: {e}");
                return false;
            }
        };
        let Some(p) = self.persistence.as_mut() else {
            return false;
        };
        match p.store.write(&p.key, &bytes) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to persist cache to {}: {e}", p.key);
                false
            }
        }
    }
}

/// Approximate entry size: JSON length of the value plus the key length.
/// Not exact byte accounting; limits are enforced against this estimate.
fn estimate_size<T: Serialize>(key: &str, value: &T) -> usize {
    let value_len = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    key.len() + value_len
}

/// 31-multiplier rolling hash over the content's characters.
fn rolling_hash(content: &str) -> u32 {
    content
        .chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
