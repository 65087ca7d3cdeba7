//! Storage layer
//!
//! Backends hold raw bytes under hierarchical keys; records are the
//! encoding of a document's state in those bytes.

mod backend;
mod fs_backend;
mod record;

pub use backend::{Backend, MemoryBackend};
pub use fs_backend::FsBackend;
pub use record::{Record, DEFAULT_COMPRESSION_LEVEL, HEADER_SIZE};
