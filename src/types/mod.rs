//! All data types for the story-memory library.

pub mod cache;
pub mod clock;
pub mod error;
pub mod memory;
pub mod search;

pub use cache::{Analyzed, CacheEntry, CacheStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SmemError, SmemResult};
pub use memory::{
    CharacterInfo, CharacterRole, CoreMemory, LongTermMemory, PlotKind, PlotPoint, PowerSystem,
    RecentMemory, WorldSetting,
};
pub use search::{MemoryKind, ResultSource, SearchOptions, SearchResult, TypeFilter};

/// Current snapshot schema version written by `export`.
pub const SCHEMA_VERSION: u32 = 1;

/// Default capacity of the recent-memory window.
pub const DEFAULT_MAX_RECENT_CHAPTERS: usize = 10;

/// Default maximum number of cache entries.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

/// Default cache size budget: 5MB of estimated serialized size.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 5 * 1024 * 1024;

/// Default cache entry time-to-live: one hour.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Returns the current time as Unix epoch milliseconds.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
