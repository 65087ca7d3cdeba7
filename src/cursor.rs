//! Snapshot cursors over a directory of pages or parts
//!
//! A cursor fixes the set of paths when it is created and reads each
//! document lazily as it is reached:
//! - paths written after the cursor was opened are never yielded;
//! - a snapshotted path shows its latest complete write;
//! - a snapshotted document deleted before it is reached is skipped by
//!   [`Cursor::next_into`], while [`Cursor::next_path`] still yields it.
//!
//! Exhaustion is reported as [`Error::EndOfSequence`]. A backend error is
//! returned once and ends the scan.

use crate::content_store::load_record;
use crate::model::{ContentPath, Document, Kind, Page, Part};
use crate::store::Backend;
use crate::{Error, Result};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Lifecycle of a cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Returned by `iterate`, nothing consumed yet
    Created,
    /// At least one entry has been produced
    Active,
    /// Terminal: the snapshot has been released
    Exhausted,
}

/// Counts a live snapshot against its store until dropped
pub(crate) struct CursorGuard {
    counter: Arc<AtomicUsize>,
}

impl CursorGuard {
    pub(crate) fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        CursorGuard { counter }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resources held while a scan is live
struct Scan {
    backend: Arc<dyn Backend>,
    remaining: std::vec::IntoIter<ContentPath>,
    _guard: CursorGuard,
}

/// Pull-based cursor over documents of one kind
pub struct Cursor<D> {
    kind: Kind,
    state: CursorState,
    scan: Option<Scan>,
    _doc: PhantomData<fn() -> D>,
}

/// Cursor over pages
pub type PageIterator = Cursor<Page>;

/// Cursor over parts
pub type PartIterator = Cursor<Part>;

impl<D> Cursor<D> {
    pub(crate) fn new(
        kind: Kind,
        backend: Arc<dyn Backend>,
        paths: Vec<ContentPath>,
        guard: CursorGuard,
    ) -> Self {
        Cursor {
            kind,
            state: CursorState::Created,
            scan: Some(Scan {
                backend,
                remaining: paths.into_iter(),
                _guard: guard,
            }),
            _doc: PhantomData,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Snapshotted paths not yet produced
    pub fn remaining(&self) -> usize {
        self.scan.as_ref().map_or(0, |scan| scan.remaining.len())
    }

    /// Produce the next path without reading its document
    pub fn next_path(&mut self) -> Result<ContentPath> {
        let next = self.scan.as_mut().and_then(|scan| scan.remaining.next());
        match next {
            Some(path) => {
                self.state = CursorState::Active;
                Ok(path)
            }
            None => {
                self.close();
                Err(Error::EndOfSequence)
            }
        }
    }

    /// Read the next document into `doc`
    pub fn next_into(&mut self, doc: &mut impl Document) -> Result<()> {
        loop {
            let path = self.next_path()?;
            let backend = match &self.scan {
                Some(scan) => Arc::clone(&scan.backend),
                None => return Err(Error::EndOfSequence),
            };

            match load_record(backend.as_ref(), self.kind, &path) {
                Ok(record) => {
                    record.fill(path.to_string(), doc);
                    return Ok(());
                }
                Err(Error::NotExist(_)) => {
                    warn!(kind = %self.kind, %path, "document removed during scan, skipping");
                }
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
    }

    /// Release the snapshot early; the cursor becomes exhausted
    pub fn close(&mut self) {
        self.scan = None;
        self.state = CursorState::Exhausted;
    }
}

impl<D: Document + Default> Cursor<D> {
    /// Produce the next document
    pub fn next_doc(&mut self) -> Result<D> {
        let mut doc = D::default();
        self.next_into(&mut doc)?;
        Ok(doc)
    }
}

impl Cursor<Page> {
    pub fn next_page(&mut self) -> Result<Page> {
        self.next_doc()
    }
}

impl Cursor<Part> {
    pub fn next_part(&mut self) -> Result<Part> {
        self.next_doc()
    }
}

impl<D: Document + Default> Iterator for Cursor<D> {
    type Item = Result<D>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_doc() {
            Ok(doc) => Some(Ok(doc)),
            Err(Error::EndOfSequence) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<D> std::fmt::Debug for Cursor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::ContentStore;

    fn seeded() -> ContentStore {
        let store = ContentStore::in_memory();
        for path in ["/b/z", "/a/y", "/a/x"] {
            store
                .write_page(&Page::new(path, "text/plain", format!("body of {}", path)))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_state_transitions() {
        let store = seeded();
        let mut cursor = store.iterate_pages("/a").unwrap();
        assert_eq!(cursor.state(), CursorState::Created);

        cursor.next_page().unwrap();
        assert_eq!(cursor.state(), CursorState::Active);
        cursor.next_page().unwrap();
        assert!(cursor.next_page().unwrap_err().is_end_of_sequence());
        assert_eq!(cursor.state(), CursorState::Exhausted);

        // No way out of Exhausted
        assert!(cursor.next_path().unwrap_err().is_end_of_sequence());
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }

    #[test]
    fn test_lexicographic_order() {
        let store = seeded();
        let paths: Vec<String> = store
            .iterate_pages("")
            .unwrap()
            .map(|page| page.unwrap().path)
            .collect();
        assert_eq!(paths, vec!["/a/x", "/a/y", "/b/z"]);
    }

    #[test]
    fn test_next_path_does_not_read() {
        let store = seeded();
        let mut cursor = store.iterate_pages("/b").unwrap();
        assert_eq!(cursor.next_path().unwrap().as_str(), "/b/z");
        assert!(cursor.next_path().unwrap_err().is_end_of_sequence());
    }

    #[test]
    fn test_deleted_during_scan_is_skipped() {
        let store = seeded();
        let mut cursor = store.iterate_pages("").unwrap();
        store.delete_page("/a/y").unwrap();

        let paths: Vec<String> = cursor.by_ref().map(|p| p.unwrap().path).collect();
        assert_eq!(paths, vec!["/a/x", "/b/z"]);
    }

    #[test]
    fn test_guard_released_on_drop_and_exhaustion() {
        let store = seeded();
        let mut first = store.iterate_pages("").unwrap();
        let second = store.iterate_parts("").unwrap();
        assert_eq!(store.active_cursors(), 2);

        drop(second);
        assert_eq!(store.active_cursors(), 1);

        while first.next_path().is_ok() {}
        assert_eq!(store.active_cursors(), 0);
    }

    #[test]
    fn test_error_ends_scan() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ContentStore::with_backend(backend.clone());
        store.write_page(&Page::new("/a", "t", "ok")).unwrap();
        backend.put_raw(ContentPath::parse("/pages/b").unwrap(), b"junk".to_vec());
        store.write_page(&Page::new("/c", "t", "ok")).unwrap();

        let mut cursor = store.iterate_pages("").unwrap();
        assert_eq!(cursor.next_page().unwrap().path, "/a");
        assert_eq!(
            cursor.next_page().unwrap_err().kind(),
            crate::ErrorKind::Corruption
        );
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.next().is_none());
        assert_eq!(store.active_cursors(), 0);
    }

    #[test]
    fn test_close_releases_snapshot() {
        let store = seeded();
        let mut cursor = store.iterate_pages("").unwrap();
        assert_eq!(cursor.remaining(), 3);
        cursor.close();
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(store.active_cursors(), 0);
    }
}
