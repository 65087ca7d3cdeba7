//! # pagestore
//!
//! A path-addressed store for pages and reusable content parts.
//!
//! ## Core Concepts
//!
//! - **Pages**: top-level documents addressed by a hierarchical path
//! - **Parts**: reusable fragments, stored the same way in their own namespace
//! - **Backends**: pluggable byte storage (in-memory or a directory tree)
//! - **Cursors**: snapshot iterators over a directory of pages or parts
//!
//! ## Example
//!
//! ```
//! use pagestore::{ContentStore, Page};
//!
//! let store = ContentStore::in_memory();
//! store.write_page(&Page::new("/blog/hello", "text/markdown", "# Hello"))?;
//!
//! let page = store.read_page("/blog/hello")?;
//! assert_eq!(page.contents, "# Hello");
//!
//! for page in store.iterate_pages("/blog")? {
//!     println!("{}", page?.path);
//! }
//! # Ok::<(), pagestore::Error>(())
//! ```

pub mod config;
pub mod cursor;
pub mod model;
pub mod store;

mod content_store;
mod error;

pub use config::{BackendKind, Config};
pub use content_store::{ContentStore, StoreStats};
pub use cursor::{Cursor, CursorState, PageIterator, PartIterator};
pub use error::{Error, ErrorKind, Result};
pub use model::{ContentPath, Document, Kind, Page, Part, DEFAULT_CONTENT_TYPE};
pub use store::{Backend, FsBackend, MemoryBackend};

/// Record format version
pub const VERSION: u32 = 1;

/// Magic bytes for record identification
pub const MAGIC: &[u8; 8] = b"PAGESTOR";

/// File extension of records in the fs backend
pub const RECORD_EXTENSION: &str = "pgs";
