//! Versioned, self-describing JSON snapshots of the memory store and the
//! content cache.
//!
//! Every snapshot carries a `format` tag naming the structure it holds and a
//! `schemaVersion`. Parsing is all-or-nothing: the whole blob is decoded
//! and validated before a caller gets to apply it.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{
    CacheEntry, CoreMemory, LongTermMemory, RecentMemory, SmemError, SmemResult, SCHEMA_VERSION,
};

/// `format` tag of a memory-store snapshot.
pub const MEMORY_SNAPSHOT_KIND: &str = "story-memory/memory";

/// `format` tag of a content-cache snapshot.
pub const CACHE_SNAPSHOT_KIND: &str = "story-memory/cache";

/// Keys of the unversioned export shape, which predates `schemaVersion`.
const LEGACY_MEMORY_KEYS: [&str; 3] = ["coreMemory", "recentMemory", "longTermMemory"];

/// Full contents of a tiered memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemorySnapshot {
    pub format: String,
    pub schema_version: u32,
    /// Unix epoch milliseconds; 0 when migrated from the legacy shape.
    #[serde(default)]
    pub exported_at: u64,
    pub core_memory: CoreMemory,
    /// Most recent chapter first.
    pub recent_memory: Vec<RecentMemory>,
    pub long_term_memory: Vec<LongTermMemory>,
}

impl MemorySnapshot {
    /// Wrap tier contents in a current-version snapshot.
    pub fn new(
        core_memory: CoreMemory,
        recent_memory: Vec<RecentMemory>,
        long_term_memory: Vec<LongTermMemory>,
        exported_at: u64,
    ) -> Self {
        Self {
            format: MEMORY_SNAPSHOT_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            exported_at,
            core_memory,
            recent_memory,
            long_term_memory,
        }
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> SmemResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode, migrate and validate a snapshot.
    pub fn parse(text: &str) -> SmemResult<Self> {
        let mut value: Value = serde_json::from_str(text)?;
        let obj = value
            .as_object_mut()
            .ok_or_else(|| SmemError::Malformed("snapshot root must be a JSON object".into()))?;

        let version = schema_version_of(obj)?.unwrap_or(0);
        if version > SCHEMA_VERSION {
            return Err(SmemError::UnsupportedVersion(version));
        }
        if version == 0 {
            migrate_legacy_memory(obj)?;
        }
        check_kind(obj, MEMORY_SNAPSHOT_KIND)?;

        let snapshot: MemorySnapshot = serde_json::from_value(value)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Decode from raw bytes (UTF-8 JSON).
    pub fn parse_bytes(bytes: &[u8]) -> SmemResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SmemError::Malformed(format!("snapshot is not UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Check identity-key uniqueness and value ranges.
    pub fn validate(&self) -> SmemResult<()> {
        let core = &self.core_memory;
        unique(core.characters.iter().map(|c| c.name.clone()), "character name")?;
        unique(
            core.world_settings.iter().map(|s| s.title.clone()),
            "world setting title",
        )?;
        unique(
            core.main_plot
                .iter()
                .map(|p| format!("{}:{}", p.chapter, p.title)),
            "plot point",
        )?;
        unique(
            self.recent_memory.iter().map(|m| m.chapter_number),
            "recent chapter",
        )?;
        unique(
            self.long_term_memory.iter().map(|m| m.chapter_number),
            "long-term chapter",
        )?;

        if core.characters.iter().any(|c| c.name.trim().is_empty()) {
            return Err(SmemError::Malformed("character with empty name".into()));
        }
        if let Some(m) = self.long_term_memory.iter().find(|m| m.importance > 100) {
            return Err(SmemError::Malformed(format!(
                "chapter {} has importance {} (max 100)",
                m.chapter_number, m.importance
            )));
        }
        Ok(())
    }
}

/// Full contents of a content cache, entries ordered least recently used
/// first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheSnapshot<T> {
    pub format: String,
    pub schema_version: u32,
    pub hits: u64,
    pub misses: u64,
    pub entries: Vec<CacheEntry<T>>,
}

impl<T> CacheSnapshot<T> {
    pub fn new(entries: Vec<CacheEntry<T>>, hits: u64, misses: u64) -> Self {
        Self {
            format: CACHE_SNAPSHOT_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            hits,
            misses,
            entries,
        }
    }
}

impl<T: Serialize> CacheSnapshot<T> {
    /// Encode as compact JSON bytes.
    pub fn to_bytes(&self) -> SmemResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<T: DeserializeOwned> CacheSnapshot<T> {
    /// Decode and validate a cache snapshot.
    pub fn parse_bytes(bytes: &[u8]) -> SmemResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let obj = value
            .as_object()
            .ok_or_else(|| SmemError::Malformed("snapshot root must be a JSON object".into()))?;

        let version = schema_version_of(obj)?
            .ok_or_else(|| SmemError::Malformed("cache snapshot has no schemaVersion".into()))?;
        if version > SCHEMA_VERSION {
            return Err(SmemError::UnsupportedVersion(version));
        }
        check_kind(obj, CACHE_SNAPSHOT_KIND)?;

        let snapshot: CacheSnapshot<T> = serde_json::from_value(value)?;
        unique(snapshot.entries.iter().map(|e| e.key.clone()), "cache key")?;
        Ok(snapshot)
    }
}

fn schema_version_of(obj: &Map<String, Value>) -> SmemResult<Option<u32>> {
    match obj.get("schemaVersion") {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                SmemError::Malformed("schemaVersion must be a non-negative integer".into())
            }),
    }
}

fn check_kind(obj: &Map<String, Value>, expected: &str) -> SmemResult<()> {
    match obj.get("format").and_then(Value::as_str) {
        None => Err(SmemError::Malformed("snapshot has no format tag".into())),
        Some(found) if found != expected => Err(SmemError::WrongSnapshotKind {
            expected: expected.to_string(),
            found: found.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

/// Upgrade the unversioned `{coreMemory, recentMemory, longTermMemory}`
/// export to schema version 1.
fn migrate_legacy_memory(obj: &mut Map<String, Value>) -> SmemResult<()> {
    if obj.contains_key("format") {
        return Err(SmemError::Malformed(
            "snapshot has a format tag but no schemaVersion".into(),
        ));
    }
    for key in LEGACY_MEMORY_KEYS {
        if !obj.contains_key(key) {
            return Err(SmemError::Malformed(format!(
                "unversioned snapshot is missing `{key}`"
            )));
        }
    }
    // The old export stamped an ISO date string; it carries no state.
    obj.remove("exportDate");
    obj.insert(
        "format".to_string(),
        Value::String(MEMORY_SNAPSHOT_KIND.to_string()),
    );
    obj.insert("schemaVersion".to_string(), Value::from(SCHEMA_VERSION));
    log::info!("Migrated unversioned memory snapshot to schema {SCHEMA_VERSION}");
    Ok(())
}

fn unique<K, I>(keys: I, what: &str) -> SmemResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(SmemError::Malformed(format!("duplicate {what}: {key}")));
        }
        seen.insert(key);
    }
    Ok(())
}
