//! Hierarchical content paths
//!
//! A [`ContentPath`] is always stored in canonical form: `/seg/seg/...`.
//! The empty path is the root directory and is only valid where a
//! directory is expected.

use super::Kind;
use crate::{Error, Result, RECORD_EXTENSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the canonical length of a path, in bytes
pub const MAX_PATH_LEN: usize = 4096;

/// Upper bound on a single segment, in bytes. Leaves room for the record
/// extension inside a 255-byte file name.
pub const MAX_SEGMENT_LEN: usize = 250;

/// A validated, canonical path inside a store namespace
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath(String);

impl ContentPath {
    /// The root directory
    pub fn root() -> Self {
        ContentPath(String::new())
    }

    /// Parse the path of an entity. The root is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let path = Self::parse_dir(raw)?;
        if path.is_root() {
            return Err(invalid(raw, "path is empty"));
        }
        Ok(path)
    }

    /// Parse a directory path. `""` and `"/"` both mean the root.
    pub fn parse_dir(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_prefix('/').unwrap_or(raw);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(ContentPath::root());
        }

        let mut canonical = String::with_capacity(trimmed.len() + 1);
        for segment in trimmed.split('/') {
            validate_segment(raw, segment)?;
            canonical.push('/');
            canonical.push_str(segment);
        }

        if canonical.len() > MAX_PATH_LEN {
            return Err(invalid(raw, "path is too long"));
        }
        Ok(ContentPath(canonical))
    }

    /// Backend directory holding every document of `kind`
    pub fn namespace(kind: Kind) -> Self {
        ContentPath(kind.namespace().to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical string form; the root is `""`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }

    /// The last segment, or `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Append `child` below this path
    pub fn join(&self, child: &ContentPath) -> ContentPath {
        ContentPath(format!("{}{}", self.0, child.0))
    }

    /// Whether this path lies strictly below directory `dir`
    ///
    /// `/a/x` is within `/a`; `/ab` and `/a` itself are not.
    pub fn is_within(&self, dir: &ContentPath) -> bool {
        if dir.is_root() {
            return !self.is_root();
        }
        self.0.len() > dir.0.len()
            && self.0.starts_with(&dir.0)
            && self.0.as_bytes()[dir.0.len()] == b'/'
    }

    /// Remove the directory prefix `dir`, if this path lies within it
    pub fn strip_prefix(&self, dir: &ContentPath) -> Option<ContentPath> {
        if !self.is_within(dir) {
            return None;
        }
        Some(ContentPath(self.0[dir.0.len()..].to_string()))
    }
}

fn invalid(raw: &str, reason: impl Into<String>) -> Error {
    Error::InvalidPath {
        path: raw.to_string(),
        reason: reason.into(),
    }
}

fn validate_segment(raw: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(invalid(raw, "empty path segment"));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(invalid(
            raw,
            format!("segment is longer than {} bytes", MAX_SEGMENT_LEN),
        ));
    }
    if segment.starts_with('.') {
        return Err(invalid(raw, format!("segment {:?} starts with '.'", segment)));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| *c == '\\' || *c == '\0' || c.is_control())
    {
        return Err(invalid(raw, format!("segment contains {:?}", c)));
    }
    let ext = segment.rsplit_once('.').map(|(_, ext)| ext);
    if ext == Some(RECORD_EXTENSION) {
        return Err(invalid(
            raw,
            format!("segment must not end with .{}", RECORD_EXTENSION),
        ));
    }
    Ok(())
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentPath({})", self)
    }
}

impl FromStr for ContentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentPath::parse(s)
    }
}

impl TryFrom<String> for ContentPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        ContentPath::parse_dir(&s)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ContentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
