//! Core data model types for pagestore

mod document;
mod path;

pub use document::{Document, Kind, Page, Part, DEFAULT_CONTENT_TYPE};
pub use path::{ContentPath, MAX_PATH_LEN, MAX_SEGMENT_LEN};
