//! Configuration loading from file and environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{
    SmemError, SmemResult, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_MAX_SIZE,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_RECENT_CHAPTERS,
};

/// Content cache limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Budget for the summed estimated entry sizes, in bytes.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: usize,
    /// Entry time-to-live in seconds. 0 disables expiry.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Mirror the cache into a byte store after every mutation.
    #[serde(default)]
    pub persistence: bool,
}

fn default_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_max_size() -> usize {
    DEFAULT_CACHE_MAX_SIZE
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_size_bytes: default_max_size(),
            ttl_secs: default_ttl_secs(),
            persistence: false,
        }
    }
}

impl CacheConfig {
    /// Set the entry limit.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the size budget.
    pub fn max_size_bytes(mut self, max_size_bytes: usize) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the TTL in seconds.
    pub fn ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Enable or disable persistence.
    pub fn persistence(mut self, enabled: bool) -> Self {
        self.persistence = enabled;
        self
    }

    /// TTL in milliseconds, `None` when expiry is disabled.
    pub fn ttl_millis(&self) -> Option<u64> {
        match self.ttl_secs {
            0 => None,
            secs => Some(secs.saturating_mul(1000)),
        }
    }

    pub fn validate(&self) -> SmemResult<()> {
        if self.max_entries == 0 {
            return Err(SmemError::Config("cache.max_entries must be at least 1".into()));
        }
        if self.max_size_bytes == 0 {
            return Err(SmemError::Config(
                "cache.max_size_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Tiered memory store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Size of the recent-memory window.
    #[serde(default = "default_max_recent_chapters")]
    pub max_recent_chapters: usize,
}

fn default_max_recent_chapters() -> usize {
    DEFAULT_MAX_RECENT_CHAPTERS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_recent_chapters: default_max_recent_chapters(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> SmemResult<()> {
        if self.max_recent_chapters == 0 {
            return Err(SmemError::Config(
                "memory.max_recent_chapters must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoryMemoryConfig {
    /// Directory holding persisted snapshots.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl StoryMemoryConfig {
    pub fn validate(&self) -> SmemResult<()> {
        self.cache.validate()?;
        self.memory.validate()
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> SmemResult<StoryMemoryConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SmemError::Io(std::io::Error::other(format!(
            "Failed to read config file {}: {e}",
            path.display()
        )))
    })?;

    let config: StoryMemoryConfig = toml::from_str(&content)
        .map_err(|e| SmemError::Config(format!("Failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Resolve the data directory using priority order:
/// 1. Explicit path (CLI arg or config file)
/// 2. SMEM_DIR environment variable
/// 3. .smem in the current directory
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("SMEM_DIR") {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(".smem")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: StoryMemoryConfig = toml::from_str("").unwrap();
        assert_eq!(config, StoryMemoryConfig::default());
        assert_eq!(config.memory.max_recent_chapters, 10);
        assert_eq!(config.cache.ttl_millis(), Some(3_600_000));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: StoryMemoryConfig =
            toml::from_str("[cache]\nmax_entries = 3\nttl_secs = 0\n").unwrap();
        assert_eq!(config.cache.max_entries, 3);
        assert_eq!(config.cache.ttl_millis(), None);
        assert_eq!(config.cache.max_size_bytes, DEFAULT_CACHE_MAX_SIZE);
    }

    #[test]
    fn zero_recent_window_is_rejected() {
        let config = MemoryConfig {
            max_recent_chapters: 0,
        };
        assert!(matches!(config.validate(), Err(SmemError::Config(_))));
    }

    #[test]
    fn explicit_data_dir_wins() {
        assert_eq!(resolve_data_dir(Some("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
