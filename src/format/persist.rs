//! Persistence adapter between the memory store and a byte store.
//!
//! Write failures are logged and swallowed: the in-memory store stays
//! authoritative for the session and the next successful save restores
//! durability. Read failures of the medium are treated the same way, while
//! a snapshot that is present but malformed is a hard error.

use crate::engine::TieredMemoryStore;
use crate::types::SmemResult;

use super::byte_store::ByteStore;
use super::snapshot::MemorySnapshot;

/// Default key of the memory-store snapshot.
pub const MEMORY_STORAGE_KEY: &str = "story-memory";

/// Default key of the persisted analysis cache.
pub const CACHE_STORAGE_KEY: &str = "analysis-cache";

/// Write a snapshot of `memory` under `key`. Returns whether the write
/// succeeded.
pub fn save_memory(memory: &TieredMemoryStore, store: &mut dyn ByteStore, key: &str) -> bool {
    let snapshot = match memory.export() {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Failed to encode memory snapshot: {e}");
            return false;
        }
    };
    match store.write(key, snapshot.as_bytes()) {
        Ok(()) => {
            log::debug!("Saved memory snapshot ({} bytes) to {key}", snapshot.len());
            true
        }
        Err(e) => {
            log::warn!("Failed to persist memory snapshot to {key}: {e}");
            false
        }
    }
}

/// Load the snapshot under `key` into `memory`.
///
/// Returns `Ok(false)` when nothing is stored or the medium cannot be read,
/// leaving `memory` untouched. A malformed snapshot is returned as an error,
/// also without touching `memory`.
pub fn load_memory(
    memory: &mut TieredMemoryStore,
    store: &dyn ByteStore,
    key: &str,
) -> SmemResult<bool> {
    let bytes = match store.read(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(false),
        Err(e) => {
            log::warn!("Failed to read memory snapshot from {key}: {e}");
            return Ok(false);
        }
    };
    let snapshot = MemorySnapshot::parse_bytes(&bytes)?;
    memory.apply_snapshot(snapshot);
    Ok(true)
}
