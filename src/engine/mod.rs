//! High-level operations: ranking, archival, the analysis cache and the
//! tiered memory store.

pub mod archive;
pub mod cache;
pub mod relevance;
pub mod store;
pub mod summary;

pub use archive::{archive, calculate_importance, derive_keywords};
pub use cache::ContentCache;
pub use relevance::{count_core_mentions, tokenize, RelevanceRanker};
pub use store::{ChapterContext, MemoryStats, TieredMemoryStore, RECENT_WEIGHT};
pub use summary::{relationship_graph, smart_summary};
