//! High-level ContentStore API
//!
//! This module provides the main entry point for reading and writing
//! pages and parts.

use crate::cursor::{Cursor, CursorGuard, PageIterator, PartIterator};
use crate::model::{ContentPath, Document, Kind, Page, Part};
use crate::store::{Backend, FsBackend, MemoryBackend, Record, DEFAULT_COMPRESSION_LEVEL};
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Number of per-path lock stripes
const LOCK_STRIPES: usize = 64;

/// Document counts per namespace
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub pages: usize,
    pub parts: usize,
}

/// Path-addressed storage of pages and parts over a [`Backend`].
///
/// Concurrency:
/// - `write`, `delete` and `move` on the same path are serialized by a
///   striped lock; disjoint paths proceed in parallel.
/// - Mutations hold the store gate shared, `iterate` holds it exclusively
///   while it takes its snapshot, so a snapshot never sees a half-applied
///   move.
/// - Reads take no store lock; backends guarantee whole-record reads.
pub struct ContentStore {
    backend: Arc<dyn Backend>,
    gate: RwLock<()>,
    stripes: Vec<Mutex<()>>,
    compression_level: i32,
    active_cursors: Arc<AtomicUsize>,
}

impl ContentStore {
    /// Create a store over the given backend
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    /// Create a store over a shared backend
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        ContentStore {
            backend,
            gate: RwLock::new(()),
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            active_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a filesystem-backed store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FsBackend::open(root)?))
    }

    /// Create an empty in-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Set the zstd level used for new records
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // === Page Operations ===

    /// Create or fully replace a page
    pub fn write_page(&self, page: &impl Document) -> Result<()> {
        self.write_doc(Kind::Page, page)
    }

    /// Read a page
    pub fn read_page(&self, path: &str) -> Result<Page> {
        let mut page = Page::default();
        self.read_into(Kind::Page, path, &mut page)?;
        Ok(page)
    }

    /// Read a page into a caller-supplied document
    pub fn read_page_into(&self, path: &str, doc: &mut impl Document) -> Result<()> {
        self.read_into(Kind::Page, path, doc)
    }

    pub fn delete_page(&self, path: &str) -> Result<()> {
        self.delete(Kind::Page, path)
    }

    /// Rename a page. Fails with `AlreadyExists` if `to` is taken.
    pub fn move_page(&self, from: &str, to: &str) -> Result<()> {
        self.move_doc(Kind::Page, from, to)
    }

    pub fn page_exists(&self, path: &str) -> Result<bool> {
        self.exists(Kind::Page, path)
    }

    /// Iterate pages below `dir` (`""` for all pages)
    pub fn iterate_pages(&self, dir: &str) -> Result<PageIterator> {
        self.iterate(Kind::Page, dir)
    }

    // === Part Operations ===

    /// Create or fully replace a part
    pub fn write_part(&self, part: &impl Document) -> Result<()> {
        self.write_doc(Kind::Part, part)
    }

    /// Read a part
    pub fn read_part(&self, path: &str) -> Result<Part> {
        let mut part = Part::default();
        self.read_into(Kind::Part, path, &mut part)?;
        Ok(part)
    }

    /// Read a part into a caller-supplied document
    pub fn read_part_into(&self, path: &str, doc: &mut impl Document) -> Result<()> {
        self.read_into(Kind::Part, path, doc)
    }

    pub fn delete_part(&self, path: &str) -> Result<()> {
        self.delete(Kind::Part, path)
    }

    /// Rename a part. Fails with `AlreadyExists` if `to` is taken.
    pub fn move_part(&self, from: &str, to: &str) -> Result<()> {
        self.move_doc(Kind::Part, from, to)
    }

    pub fn part_exists(&self, path: &str) -> Result<bool> {
        self.exists(Kind::Part, path)
    }

    /// Iterate parts below `dir` (`""` for all parts)
    pub fn iterate_parts(&self, dir: &str) -> Result<PartIterator> {
        self.iterate(Kind::Part, dir)
    }

    // === Store-wide ===

    /// Count pages and parts
    pub fn stats(&self) -> Result<StoreStats> {
        let _gate = self.gate.write();
        Ok(StoreStats {
            pages: self
                .backend
                .list(&ContentPath::namespace(Kind::Page))?
                .len(),
            parts: self
                .backend
                .list(&ContentPath::namespace(Kind::Part))?
                .len(),
        })
    }

    /// Number of cursors that still hold a snapshot
    pub fn active_cursors(&self) -> usize {
        self.active_cursors.load(Ordering::SeqCst)
    }

    // === Shared implementation ===

    /// Write any document into the `kind` namespace
    pub fn write_doc(&self, kind: Kind, doc: &impl Document) -> Result<()> {
        let path = ContentPath::parse(doc.path()).map_err(|e| refuse_path(doc.path(), e))?;
        let key = ContentPath::namespace(kind).join(&path);

        // Encode first so a codec failure never touches the backend
        let data = Record::from_document(kind, doc).encode(self.compression_level)?;

        let _gate = self.gate.read();
        let _lock = self.stripes[self.stripe(&key)].lock();
        self.backend
            .write(&key, &data)
            .map_err(|e| relabel(e, &path))?;

        debug!(%kind, %path, bytes = data.len(), "wrote document");
        Ok(())
    }

    /// Read a document of `kind` into `doc`
    pub fn read_into(&self, kind: Kind, path: &str, doc: &mut impl Document) -> Result<()> {
        let path = ContentPath::parse(path)?;
        let record = load_record(self.backend.as_ref(), kind, &path)?;
        record.fill(path.to_string(), doc);
        debug!(%kind, %path, "read document");
        Ok(())
    }

    pub fn delete(&self, kind: Kind, path: &str) -> Result<()> {
        let path = ContentPath::parse(path)?;
        let key = ContentPath::namespace(kind).join(&path);

        let _gate = self.gate.read();
        let _lock = self.stripes[self.stripe(&key)].lock();
        self.backend.remove(&key).map_err(|e| relabel(e, &path))?;

        debug!(%kind, %path, "deleted document");
        Ok(())
    }

    /// Rename a document of `kind` as one observable step
    pub fn move_doc(&self, kind: Kind, from: &str, to: &str) -> Result<()> {
        let from = ContentPath::parse(from)?;
        let to = ContentPath::parse(to).map_err(|e| refuse_path(to, e))?;
        let namespace = ContentPath::namespace(kind);
        let from_key = namespace.join(&from);
        let to_key = namespace.join(&to);

        let _gate = self.gate.read();
        let (first, second) = {
            let a = self.stripe(&from_key);
            let b = self.stripe(&to_key);
            (a.min(b), a.max(b))
        };
        let _first = self.stripes[first].lock();
        let _second = (second != first).then(|| self.stripes[second].lock());

        if !self.backend.exists(&from_key)? {
            return Err(Error::NotExist(from.to_string()));
        }
        if from == to {
            return Ok(());
        }
        if self.backend.exists(&to_key)? {
            return Err(Error::AlreadyExists(to.to_string()));
        }

        self.backend
            .rename(&from_key, &to_key)
            .map_err(|e| match e {
                Error::NotExist(_) => Error::NotExist(from.to_string()),
                other => relabel(other, &to),
            })?;

        debug!(%kind, %from, %to, "moved document");
        Ok(())
    }

    pub fn exists(&self, kind: Kind, path: &str) -> Result<bool> {
        let path = ContentPath::parse(path)?;
        self.backend
            .exists(&ContentPath::namespace(kind).join(&path))
    }

    /// Snapshot the paths below `dir` and return a cursor over them
    pub fn iterate<D: Document + Default>(&self, kind: Kind, dir: &str) -> Result<Cursor<D>> {
        let dir = ContentPath::parse_dir(dir)?;
        let namespace = ContentPath::namespace(kind);
        let scope = namespace.join(&dir);

        let keys = {
            let _gate = self.gate.write();
            self.backend.list(&scope)?
        };

        let mut paths: Vec<ContentPath> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(&namespace))
            .collect();
        paths.sort();
        paths.dedup();

        debug!(%kind, %dir, entries = paths.len(), "opened cursor");
        Ok(Cursor::new(
            kind,
            Arc::clone(&self.backend),
            paths,
            CursorGuard::new(Arc::clone(&self.active_cursors)),
        ))
    }

    fn stripe(&self, key: &ContentPath) -> usize {
        let hash = blake3::hash(key.as_str().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % LOCK_STRIPES as u64) as usize
    }
}

/// Load and verify the record stored for `path` in the `kind` namespace
pub(crate) fn load_record(backend: &dyn Backend, kind: Kind, path: &ContentPath) -> Result<Record> {
    let key = ContentPath::namespace(kind).join(path);
    let data = backend.read(&key).map_err(|e| relabel(e, path))?;
    let record = Record::decode(&data)?;
    if record.kind != kind {
        return Err(Error::Corruption(format!(
            "Expected {}, found {} at {}",
            kind, record.kind, path
        )));
    }
    Ok(record)
}

/// Report backend errors against the caller's path, not the namespaced key
fn relabel(err: Error, path: &ContentPath) -> Error {
    match err {
        Error::NotExist(_) => Error::NotExist(path.to_string()),
        Error::AlreadyExists(_) => Error::AlreadyExists(path.to_string()),
        Error::NotWritable { reason, .. } => Error::NotWritable {
            path: path.to_string(),
            reason,
        },
        Error::Backend { op, source, .. } => Error::Backend {
            op,
            path: path.to_string(),
            source,
        },
        other => other,
    }
}

/// A path that cannot be stored is a refused write
fn refuse_path(raw: &str, err: Error) -> Error {
    match err {
        Error::InvalidPath { reason, .. } => Error::NotWritable {
            path: raw.to_string(),
            reason,
        },
        other => other,
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("backend", &self.backend.name())
            .field("compression_level", &self.compression_level)
            .field("active_cursors", &self.active_cursors())
            .finish()
    }
}
