//! Key-value byte stores that snapshots are persisted into.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::types::error::{SmemError, SmemResult};

use super::compression::{compress_bytes, decompress_bytes};

/// Abstract persistence medium: opaque bytes under string keys.
pub trait ByteStore {
    /// Read the bytes stored under `key`, `None` when absent.
    fn read(&self, key: &str) -> SmemResult<Option<Vec<u8>>>;
    /// Replace the bytes stored under `key`.
    fn write(&mut self, key: &str, bytes: &[u8]) -> SmemResult<()>;
    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> SmemResult<()>;
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    items: HashMap<String, Vec<u8>>,
    quota: Option<usize>,
    unavailable: bool,
}

/// In-process byte store. Clones share the same contents, so a caller can
/// keep a handle to inspect what a cache or adapter wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryByteStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

impl MemoryByteStore {
    /// Create an empty, unlimited store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store holding at most `quota` bytes in total.
    pub fn with_quota(quota: usize) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().quota = Some(quota);
        store
    }

    /// Simulate the medium going away: every operation fails with an IO
    /// error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.borrow_mut().unavailable = unavailable;
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.inner.borrow().items.values().map(Vec::len).sum()
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.borrow().items.contains_key(key)
    }

    fn check_available(inner: &MemoryStoreInner) -> SmemResult<()> {
        if inner.unavailable {
            return Err(SmemError::Io(std::io::Error::new(
                ErrorKind::NotConnected,
                "byte store unavailable",
            )));
        }
        Ok(())
    }
}

impl ByteStore for MemoryByteStore {
    fn read(&self, key: &str) -> SmemResult<Option<Vec<u8>>> {
        let inner = self.inner.borrow();
        Self::check_available(&inner)?;
        Ok(inner.items.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> SmemResult<()> {
        let mut inner = self.inner.borrow_mut();
        Self::check_available(&inner)?;
        if let Some(quota) = inner.quota {
            let others: usize = inner
                .items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let available = quota.saturating_sub(others);
            if bytes.len() > available {
                return Err(SmemError::QuotaExceeded {
                    needed: bytes.len(),
                    available,
                });
            }
        }
        inner.items.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SmemResult<()> {
        let mut inner = self.inner.borrow_mut();
        Self::check_available(&inner)?;
        inner.items.remove(key);
        Ok(())
    }
}

/// Directory-backed byte store: one LZ4-compressed file per key.
#[derive(Debug, Clone)]
pub struct FileByteStore {
    dir: PathBuf,
}

impl FileByteStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> SmemResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory of this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `key`.
    ///
    /// `[A-Za-z0-9.-]` pass through; every other byte (including `_` and a
    /// leading `.`) becomes `_` plus two hex digits. The mapping is
    /// injective, so distinct keys never share a file, and no key can name
    /// a path outside the directory.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for (i, b) in key.bytes().enumerate() {
            let plain = b.is_ascii_alphanumeric() || b == b'-' || (b == b'.' && i > 0);
            if plain {
                name.push(char::from(b));
            } else {
                name.push('_');
                name.push_str(&hex::encode([b]));
            }
        }
        name.push_str(".smem");
        self.dir.join(name)
    }
}

impl ByteStore for FileByteStore {
    fn read(&self, key: &str) -> SmemResult<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(decompress_bytes(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> SmemResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("smem.tmp");
        std::fs::write(&tmp, compress_bytes(bytes))?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SmemResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_counts_other_keys_only() {
        let mut store = MemoryByteStore::with_quota(10);
        store.write("a", &[0; 6]).unwrap();
        // Replacing "a" frees its old bytes.
        store.write("a", &[0; 9]).unwrap();
        let err = store.write("b", &[0; 2]).unwrap_err();
        assert!(matches!(
            err,
            SmemError::QuotaExceeded {
                needed: 2,
                available: 1
            }
        ));
    }

    #[test]
    fn clones_share_contents() {
        let handle = MemoryByteStore::new();
        let mut writer = handle.clone();
        writer.write("k", b"v").unwrap();
        assert_eq!(handle.read("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let store = FileByteStore {
            dir: PathBuf::from("/data"),
        };
        assert_eq!(
            store.path_for("../secret/key"),
            PathBuf::from("/data/_2e._2fsecret_2fkey.smem")
        );
        assert_eq!(
            store.path_for("story-memory"),
            PathBuf::from("/data/story-memory.smem")
        );
    }

    #[test]
    fn similar_keys_map_to_distinct_files() {
        let store = FileByteStore {
            dir: PathBuf::from("/data"),
        };
        let keys = ["a/b", "a_b", "a_2fb", "a b", ".x", "x", "é"];
        let paths: std::collections::HashSet<PathBuf> =
            keys.iter().map(|k| store.path_for(k)).collect();
        assert_eq!(paths.len(), keys.len());
    }
}
