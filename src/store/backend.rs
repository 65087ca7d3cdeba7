//! Storage backends
//!
//! A backend is a flat, hierarchical key space of byte blobs. It knows
//! nothing about pages, parts or records; the [`ContentStore`] layers
//! those on top.
//!
//! [`ContentStore`]: crate::ContentStore

use crate::model::ContentPath;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Filesystem-like storage primitives.
///
/// Implementations must satisfy:
/// - `write` creates or replaces atomically: readers see the old bytes or
///   the new bytes, never a mix, and a failed write leaves the old bytes.
/// - `read`, `remove` and the source of `rename` fail with
///   [`Error::NotExist`] when nothing is stored at the key.
/// - `write` fails with [`Error::NotWritable`] when the medium refuses
///   the key (permissions, read-only media, names it cannot represent).
/// - `rename` replaces any existing destination. Callers that need
///   no-clobber semantics must check first.
/// - `list` returns every key strictly within `dir`, in any order.
pub trait Backend: Send + Sync {
    /// Short name for status output and logs
    fn name(&self) -> &'static str;

    fn read(&self, key: &ContentPath) -> Result<Vec<u8>>;

    fn write(&self, key: &ContentPath, data: &[u8]) -> Result<()>;

    fn remove(&self, key: &ContentPath) -> Result<()>;

    fn rename(&self, from: &ContentPath, to: &ContentPath) -> Result<()>;

    fn exists(&self, key: &ContentPath) -> Result<bool>;

    fn list(&self, dir: &ContentPath) -> Result<Vec<ContentPath>>;
}

/// In-memory backend for tests and embedding
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<ContentPath, Vec<u8>>>,
    read_only: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            entries: RwLock::new(BTreeMap::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Refuse (or accept again) every mutation with `NotWritable`
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of stored keys across all namespaces
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Overwrite raw bytes, bypassing the read-only flag
    pub fn put_raw(&self, key: ContentPath, data: Vec<u8>) {
        self.entries.write().insert(key, data);
    }

    fn check_writable(&self, key: &ContentPath) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::NotWritable {
                path: key.to_string(),
                reason: "backend is read-only".into(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &ContentPath) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotExist(key.to_string()))
    }

    fn write(&self, key: &ContentPath, data: &[u8]) -> Result<()> {
        self.check_writable(key)?;
        self.entries.write().insert(key.clone(), data.to_vec());
        Ok(())
    }

    fn remove(&self, key: &ContentPath) -> Result<()> {
        self.check_writable(key)?;
        self.entries
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotExist(key.to_string()))
    }

    fn rename(&self, from: &ContentPath, to: &ContentPath) -> Result<()> {
        self.check_writable(to)?;
        let mut entries = self.entries.write();
        let data = entries
            .remove(from)
            .ok_or_else(|| Error::NotExist(from.to_string()))?;
        entries.insert(to.clone(), data);
        Ok(())
    }

    fn exists(&self, key: &ContentPath) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn list(&self, dir: &ContentPath) -> Result<Vec<ContentPath>> {
        let entries = self.entries.read();
        Ok(entries
            .range(dir.clone()..)
            .take_while(|(key, _)| key.as_str().starts_with(dir.as_str()))
            .filter(|(key, _)| key.is_within(dir))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.len())
            .field("read_only", &self.read_only.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ContentPath {
        ContentPath::parse(s).unwrap()
    }

    #[test]
    fn test_read_missing_is_not_exist() {
        let backend = MemoryBackend::new();
        assert!(backend.read(&key("/nope")).unwrap_err().is_not_exist());
        assert!(backend.remove(&key("/nope")).unwrap_err().is_not_exist());
    }

    #[test]
    fn test_write_read_remove() {
        let backend = MemoryBackend::new();
        backend.write(&key("/a"), b"one").unwrap();
        backend.write(&key("/a"), b"two").unwrap();
        assert_eq!(backend.read(&key("/a")).unwrap(), b"two");
        backend.remove(&key("/a")).unwrap();
        assert!(!backend.exists(&key("/a")).unwrap());
    }

    #[test]
    fn test_rename_moves_bytes() {
        let backend = MemoryBackend::new();
        backend.write(&key("/a"), b"data").unwrap();
        backend.rename(&key("/a"), &key("/b/c")).unwrap();
        assert!(!backend.exists(&key("/a")).unwrap());
        assert_eq!(backend.read(&key("/b/c")).unwrap(), b"data");
        assert!(backend
            .rename(&key("/a"), &key("/z"))
            .unwrap_err()
            .is_not_exist());
    }

    #[test]
    fn test_list_is_scoped() {
        let backend = MemoryBackend::new();
        for k in ["/a", "/a-b", "/a/x", "/a/y/z", "/a0", "/b/z"] {
            backend.write(&key(k), b"").unwrap();
        }
        let listed = backend.list(&ContentPath::parse_dir("/a").unwrap()).unwrap();
        assert_eq!(listed, vec![key("/a/x"), key("/a/y/z")]);
        assert_eq!(backend.list(&ContentPath::root()).unwrap().len(), 6);
    }

    #[test]
    fn test_read_only_refuses_mutation() {
        let backend = MemoryBackend::new();
        backend.write(&key("/a"), b"kept").unwrap();
        backend.set_read_only(true);
        let err = backend.write(&key("/a"), b"lost").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotWritable);
        assert_eq!(backend.read(&key("/a")).unwrap(), b"kept");
        backend.set_read_only(false);
        backend.write(&key("/a"), b"new").unwrap();
    }
}
