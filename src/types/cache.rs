//! Cache entry and statistics types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single cached analysis result.
///
/// The entry is only valid while `content_hash` equals the hash of the
/// content presented at lookup time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    /// Hex SHA-256 of the analyzed content.
    pub content_hash: String,
    /// Unix epoch milliseconds.
    pub created_at: u64,
    /// Unix epoch milliseconds.
    pub last_accessed_at: u64,
    pub access_count: u32,
    /// Approximate size: length of the JSON-serialized value plus the key.
    pub size_bytes: usize,
}

/// Snapshot of cache counters. Sizes and timestamps are derived from the
/// live entries each time stats are requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 when nothing was looked up yet.
    pub hit_rate: f64,
    pub total_size: usize,
    pub total_entries: usize,
    pub oldest_entry: Option<u64>,
    pub newest_entry: Option<u64>,
}

/// Result of a cache-wrapped analyzer call.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzed<T> {
    pub value: T,
    /// True when served without calling the analyzer.
    pub from_cache: bool,
    /// Wall time spent inside the call, lookup included.
    pub elapsed: Duration,
}
