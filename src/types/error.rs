//! Error types for the story-memory library.

use thiserror::Error;

/// All errors that can occur in the story-memory library.
///
/// Capacity and expiry conditions are never reported here: eviction and
/// stale-entry misses are ordinary control flow.
#[derive(Error, Debug)]
pub enum SmemError {
    /// A persisted snapshot could not be parsed or failed validation.
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    /// Snapshot was written by a newer schema than this build understands.
    #[error("Unsupported snapshot schema version: {0}")]
    UnsupportedVersion(u32),

    /// Snapshot describes a different structure than the one being imported.
    #[error("Wrong snapshot kind: expected {expected}, found {found}")]
    WrongSnapshotKind { expected: String, found: String },

    /// Character lookup by name failed.
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    /// Byte store refused a write because it would exceed its quota.
    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),
}

impl From<serde_json::Error> for SmemError {
    fn from(err: serde_json::Error) -> Self {
        SmemError::Malformed(err.to_string())
    }
}

/// Convenience result type for story-memory operations.
pub type SmemResult<T> = Result<T, SmemError>;
