//! Phase 1 tests: content-addressed analysis cache.

use std::cell::Cell;

use story_memory::config::CacheConfig;
use story_memory::engine::ContentCache;
use story_memory::format::{ByteStore, MemoryByteStore};
use story_memory::types::{ManualClock, SmemError};

// ==================== Helper ====================

const T0: u64 = 1_000_000;

/// Cache of strings on a manual clock starting at T0.
fn make_cache(max_entries: usize, ttl_secs: u64) -> (ContentCache<String>, ManualClock) {
    let clock = ManualClock::new(T0);
    let config = CacheConfig::default()
        .max_entries(max_entries)
        .ttl_secs(ttl_secs);
    (ContentCache::with_clock(config, clock.clone()), clock)
}

fn persistent_config() -> CacheConfig {
    CacheConfig::default().max_entries(3).persistence(true)
}

// ==================== Lookup & content addressing ====================

#[test]
fn test_set_then_get_hits() {
    let (mut cache, _) = make_cache(10, 60);
    cache.set("k", "result".to_string(), "chapter text");
    assert_eq!(cache.get("k", "chapter text"), Some("result".to_string()));
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_missing_key_is_a_miss() {
    let (mut cache, _) = make_cache(10, 60);
    assert_eq!(cache.get("nope", "text"), None);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_content_mismatch_misses_and_deletes() {
    let (mut cache, _) = make_cache(10, 60);
    // Same key for both texts stands in for a rolling-hash collision.
    cache.set("collide", "old analysis".to_string(), "first draft");
    assert_eq!(cache.get("collide", "second draft"), None);
    assert!(!cache.has("collide"));
    assert_eq!(cache.len(), 0);

    // The original content no longer hits either: the entry is gone.
    assert_eq!(cache.get("collide", "first draft"), None);
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_key_for_changes_with_one_character() {
    let a = ContentCache::<String>::key_for("style", "The rain fell.");
    let b = ContentCache::<String>::key_for("style", "The rain fell!");
    assert_ne!(a, b);
    assert!(a.starts_with("style_"));
}

// ==================== LRU ====================

#[test]
fn test_lru_evicts_first_inserted() {
    let (mut cache, _) = make_cache(3, 60);
    for key in ["a", "b", "c", "d"] {
        cache.set(key, key.to_uppercase(), key);
    }
    assert!(!cache.has("a"));
    assert!(cache.has("b"));
    assert!(cache.has("c"));
    assert!(cache.has("d"));
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_get_refreshes_lru_order() {
    let (mut cache, _) = make_cache(3, 60);
    cache.set("a", "A".to_string(), "a");
    cache.set("b", "B".to_string(), "b");
    cache.set("c", "C".to_string(), "c");
    assert_eq!(cache.len(), 3);

    assert_eq!(cache.get("a", "a"), Some("A".to_string()));
    cache.set("d", "D".to_string(), "d");

    assert!(!cache.has("b"));
    assert!(cache.has("a"));
    assert!(cache.has("c"));
    assert!(cache.has("d"));
}

#[test]
fn test_replacing_key_does_not_evict_others() {
    let (mut cache, _) = make_cache(2, 60);
    cache.set("a", "A1".to_string(), "a");
    cache.set("b", "B".to_string(), "b");
    cache.set("a", "A2".to_string(), "a2");
    assert!(cache.has("b"));
    assert_eq!(cache.get("a", "a2"), Some("A2".to_string()));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_size_budget_evicts_oldest() {
    let clock = ManualClock::new(T0);
    // "k1" + "\"0123456789\"" -> 2 + 12 = 14 estimated bytes per entry.
    let config = CacheConfig::default().max_entries(100).max_size_bytes(30);
    let mut cache: ContentCache<String> = ContentCache::with_clock(config, clock);

    cache.set("k1", "0123456789".to_string(), "one");
    cache.set("k2", "0123456789".to_string(), "two");
    assert_eq!(cache.stats().total_size, 28);

    cache.set("k3", "0123456789".to_string(), "three");
    assert!(!cache.has("k1"));
    assert!(cache.has("k2"));
    assert!(cache.has("k3"));
    assert_eq!(cache.stats().total_size, 28);
}

#[test]
fn test_oversized_value_is_not_cached() {
    let config = CacheConfig::default().max_size_bytes(10);
    let mut cache: ContentCache<String> = ContentCache::with_clock(config, ManualClock::new(T0));
    cache.set("small", "x".to_string(), "s");
    assert!(!cache.set("big", "0123456789".to_string(), "b"));
    assert!(!cache.has("big"));
    // The existing entry was not flushed to make room.
    assert!(cache.has("small"));
}

// ==================== TTL ====================

#[test]
fn test_ttl_boundary() {
    let (mut cache, clock) = make_cache(10, 10);
    cache.set("k", "v".to_string(), "text");

    clock.set(T0 + 9_999);
    assert_eq!(cache.get("k", "text"), Some("v".to_string()));

    clock.set(T0 + 10_000);
    assert_eq!(cache.get("k", "text"), None);
    assert_eq!(cache.len(), 0);
}

#[test]
fn test_hit_does_not_extend_ttl() {
    let (mut cache, clock) = make_cache(10, 10);
    cache.set("k", "v".to_string(), "text");
    clock.advance(6_000);
    assert!(cache.get("k", "text").is_some());
    clock.advance(6_000);
    assert!(cache.get("k", "text").is_none());
}

#[test]
fn test_zero_ttl_never_expires() {
    let (mut cache, clock) = make_cache(10, 0);
    cache.set("k", "v".to_string(), "text");
    clock.advance(365 * 24 * 3_600_000);
    assert_eq!(cache.get("k", "text"), Some("v".to_string()));
}

#[test]
fn test_clean_expired_sweeps_only_stale_entries() {
    let (mut cache, clock) = make_cache(10, 10);
    cache.set("old", "1".to_string(), "old");
    clock.advance(5_000);
    cache.set("new", "2".to_string(), "new");
    clock.advance(5_000);

    assert_eq!(cache.clean_expired(), 1);
    assert!(!cache.has("old"));
    assert!(cache.has("new"));
    assert_eq!(cache.clean_expired(), 0);
}

// ==================== Stats ====================

#[test]
fn test_stats_are_derived_from_entries() {
    let (mut cache, clock) = make_cache(10, 60);
    assert_eq!(cache.stats().hit_rate, 0.0);
    assert_eq!(cache.stats().oldest_entry, None);

    cache.set("a", "x".to_string(), "a");
    clock.advance(500);
    cache.set("b", "y".to_string(), "b");

    assert!(cache.get("a", "a").is_some());
    assert!(cache.get("b", "changed").is_none());
    assert!(cache.get("c", "c").is_none());

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert!((stats.hit_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.total_entries, 1);
    // "a" + "\"x\""
    assert_eq!(stats.total_size, 4);
    assert_eq!(stats.oldest_entry, Some(T0));
    assert_eq!(stats.newest_entry, Some(T0));
}

#[test]
fn test_clear_resets_everything() {
    let (mut cache, _) = make_cache(10, 60);
    cache.set("a", "x".to_string(), "a");
    cache.get("a", "a");
    cache.clear();
    let stats = cache.stats();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.total_size, 0);
}

// ==================== Analyzer wrapping ====================

#[test]
fn test_with_cache_runs_analyzer_once_per_content() {
    let calls = Cell::new(0u32);
    let mut cache: ContentCache<usize> = ContentCache::new(CacheConfig::default());
    {
        let mut analyze = cache.with_cache("len", |text: &str| {
            calls.set(calls.get() + 1);
            text.len()
        });
        let first = analyze("hello");
        assert!(!first.from_cache);
        assert_eq!(first.value, 5);

        let second = analyze("hello");
        assert!(second.from_cache);
        assert_eq!(second.value, 5);

        let third = analyze("world!");
        assert!(!third.from_cache);
        assert_eq!(third.value, 6);
    }
    assert_eq!(calls.get(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_prefixes_are_separate_namespaces() {
    let mut cache: ContentCache<String> = ContentCache::new(CacheConfig::default());
    let style = cache.get_or_analyze("style", "text", |_| "style".to_string());
    let tension = cache.get_or_analyze("tension", "text", |_| "tension".to_string());
    assert!(!style.from_cache);
    assert!(!tension.from_cache);
    assert_eq!(tension.value, "tension");
}

#[test]
fn test_reanalyzes_after_expiry() {
    let (mut cache, clock) = make_cache(10, 1);
    let calls = Cell::new(0u32);
    let analyze = |t: &str| {
        calls.set(calls.get() + 1);
        t.to_uppercase()
    };
    cache.get_or_analyze("up", "abc", analyze);
    cache.get_or_analyze("up", "abc", analyze);
    clock.advance(1_000);
    let again = cache.get_or_analyze("up", "abc", analyze);
    assert!(!again.from_cache);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_failed_analysis_is_not_cached() {
    let mut cache: ContentCache<String> = ContentCache::new(CacheConfig::default());
    let failed: Result<_, String> =
        cache.try_get_or_analyze("p", "text", |_| Err("analyzer crashed".to_string()));
    assert!(failed.is_err());
    assert!(cache.is_empty());

    let ok: Result<_, String> = cache.try_get_or_analyze("p", "text", |t| Ok(t.to_string()));
    assert!(!ok.unwrap().from_cache);
    let cached: Result<_, String> = cache.try_get_or_analyze("p", "text", |_| Ok(String::new()));
    let cached = cached.unwrap();
    assert!(cached.from_cache);
    assert_eq!(cached.value, "text");
}

// ==================== Persistence ====================

#[test]
fn test_persisted_cache_restores_entries_and_order() {
    let store = MemoryByteStore::new();
    let clock = ManualClock::new(T0);
    {
        let mut cache: ContentCache<String> = ContentCache::with_store(
            persistent_config(),
            clock.clone(),
            Box::new(store.clone()),
            "cache",
        );
        cache.set("a", "A".to_string(), "a");
        cache.set("b", "B".to_string(), "b");
        cache.set("c", "C".to_string(), "c");
        assert!(cache.get("a", "a").is_some());
        assert!(cache.flush());
    }
    assert!(store.contains("cache"));

    let mut restored: ContentCache<String> = ContentCache::with_store(
        persistent_config(),
        clock.clone(),
        Box::new(store.clone()),
        "cache",
    );
    assert_eq!(restored.len(), 3);
    assert_eq!(restored.stats().hits, 1);

    // Access order survived: "b" is now the least recently used.
    restored.set("d", "D".to_string(), "d");
    assert!(!restored.has("b"));
    assert!(restored.has("a"));
}

#[test]
fn test_malformed_persisted_cache_starts_empty() {
    let store = MemoryByteStore::new();
    let mut handle = store.clone();
    handle.write("cache", b"not json at all").unwrap();

    let mut cache: ContentCache<String> = ContentCache::with_store(
        persistent_config(),
        ManualClock::new(T0),
        Box::new(store.clone()),
        "cache",
    );
    assert!(cache.is_empty());
    cache.set("a", "A".to_string(), "a");
    let bytes = store.read("cache").unwrap().unwrap();
    assert!(bytes.starts_with(b"{"));
}

#[test]
fn test_unavailable_store_does_not_break_cache() {
    let store = MemoryByteStore::new();
    store.set_unavailable(true);
    let mut cache: ContentCache<String> = ContentCache::with_store(
        persistent_config(),
        ManualClock::new(T0),
        Box::new(store.clone()),
        "cache",
    );
    assert!(cache.set("a", "A".to_string(), "a"));
    assert_eq!(cache.get("a", "a"), Some("A".to_string()));
    assert!(!cache.flush());
}

#[test]
fn test_persistence_off_ignores_store() {
    let store = MemoryByteStore::new();
    let config = CacheConfig::default().persistence(false);
    let mut cache: ContentCache<String> = ContentCache::with_store(
        config,
        ManualClock::new(T0),
        Box::new(store.clone()),
        "cache",
    );
    cache.set("a", "A".to_string(), "a");
    assert!(!store.contains("cache"));
}

#[test]
fn test_zero_limits_are_raised_to_one() {
    let config = CacheConfig::default().max_entries(0);
    let mut cache: ContentCache<String> = ContentCache::with_clock(config, ManualClock::new(T0));
    assert_eq!(cache.config().max_entries, 1);

    cache.set("a", "A".to_string(), "a");
    cache.set("b", "B".to_string(), "b");
    assert_eq!(cache.len(), 1);
    assert!(cache.has("b"));

    let config = CacheConfig::default().max_size_bytes(0);
    let mut cache: ContentCache<String> = ContentCache::with_clock(config, ManualClock::new(T0));
    assert!(!cache.set("a", "A".to_string(), "a"));
    assert!(cache.is_empty());
}

#[test]
fn test_with_config_rejects_zero_limits() {
    let zero_entries = CacheConfig::default().max_entries(0);
    assert!(matches!(
        ContentCache::<String>::with_config(zero_entries),
        Err(SmemError::Config(_))
    ));
    let zero_size = CacheConfig::default().max_size_bytes(0);
    assert!(ContentCache::<String>::with_config(zero_size).is_err());
    assert!(ContentCache::<String>::with_config(CacheConfig::default()).is_ok());
}
