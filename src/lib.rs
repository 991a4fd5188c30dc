//! story-memory: tiered story memory and a content-addressed analysis cache
//! for long-form writing tools.
//!
//! The [`TieredMemoryStore`] keeps permanent core facts (characters, world,
//! plot, power system), a bounded window of recent chapter digests, and an
//! archive of older chapters with precomputed importance. The
//! [`ContentCache`] memoizes expensive text analyses keyed by the content
//! they were computed from.

pub mod cli;
pub mod config;
pub mod engine;
pub mod format;
pub mod index;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{CacheConfig, MemoryConfig, StoryMemoryConfig};
pub use engine::{
    ChapterContext, ContentCache, MemoryStats, RelevanceRanker, TieredMemoryStore,
};
pub use format::{
    load_memory, save_memory, ByteStore, CacheSnapshot, FileByteStore, MemoryByteStore,
    MemorySnapshot,
};
pub use index::{AccessOrder, KeyIndex};
pub use types::{
    now_millis, Analyzed, CacheEntry, CacheStats, CharacterInfo, CharacterRole, Clock, CoreMemory,
    LongTermMemory, ManualClock, MemoryKind, PlotKind, PlotPoint, PowerSystem, RecentMemory,
    ResultSource, SearchOptions, SearchResult, SmemError, SmemResult, SystemClock, TypeFilter,
    WorldSetting, DEFAULT_MAX_RECENT_CHAPTERS, SCHEMA_VERSION,
};
