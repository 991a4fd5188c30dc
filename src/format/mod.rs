//! Snapshot encoding and byte-store persistence.

pub mod byte_store;
pub mod compression;
pub mod persist;
pub mod snapshot;

pub use byte_store::{ByteStore, FileByteStore, MemoryByteStore};
pub use persist::{load_memory, save_memory, CACHE_STORAGE_KEY, MEMORY_STORAGE_KEY};
pub use snapshot::{CacheSnapshot, MemorySnapshot, CACHE_SNAPSHOT_KIND, MEMORY_SNAPSHOT_KIND};
