//! Configuration for caches, memory stores and the CLI.

pub mod loader;

pub use loader::{load_config, resolve_data_dir, CacheConfig, MemoryConfig, StoryMemoryConfig};
