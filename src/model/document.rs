//! Pages and parts - the two roles a stored document can play

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type used when a document does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "text/markdown";

/// The method set shared by pages and parts.
///
/// Any type exposing these accessors can be written to or read from a
/// [`ContentStore`](crate::ContentStore); callers are free to bring their
/// own document types.
pub trait Document {
    fn path(&self) -> &str;
    fn set_path(&mut self, path: String);
    fn content_type(&self) -> &str;
    fn set_content_type(&mut self, content_type: String);
    fn contents(&self) -> &str;
    fn set_contents(&mut self, contents: String);
}

/// Which namespace of the store a document lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Page,
    Part,
}

impl Kind {
    pub fn as_byte(&self) -> u8 {
        match self {
            Kind::Page => 0,
            Kind::Part => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Kind::Page),
            1 => Some(Kind::Part),
            _ => None,
        }
    }

    /// Top-level backend directory holding this namespace
    pub fn namespace(&self) -> &'static str {
        match self {
            Kind::Page => "/pages",
            Kind::Part => "/parts",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Page => write!(f, "page"),
            Kind::Part => write!(f, "part"),
        }
    }
}

/// A top-level content document, e.g. a site page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub path: String,
    pub content_type: String,
    pub contents: String,
}

impl Page {
    pub fn new(
        path: impl Into<String>,
        content_type: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Page {
            path: path.into(),
            content_type: content_type.into(),
            contents: contents.into(),
        }
    }
}

impl Document for Page {
    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn set_content_type(&mut self, content_type: String) {
        self.content_type = content_type;
    }

    fn contents(&self) -> &str {
        &self.contents
    }

    fn set_contents(&mut self, contents: String) {
        self.contents = contents;
    }
}

/// A reusable fragment that pages are composed from
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub path: String,
    pub content_type: String,
    pub contents: String,
}

impl Part {
    pub fn new(
        path: impl Into<String>,
        content_type: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Part {
            path: path.into(),
            content_type: content_type.into(),
            contents: contents.into(),
        }
    }
}

impl Document for Part {
    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn set_content_type(&mut self, content_type: String) {
        self.content_type = content_type;
    }

    fn contents(&self) -> &str {
        &self.contents
    }

    fn set_contents(&mut self, contents: String) {
        self.contents = contents;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_byte_roundtrip() {
        for kind in [Kind::Page, Kind::Part] {
            assert_eq!(Kind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(Kind::from_byte(9), None);
    }

    #[test]
    fn test_namespaces_differ() {
        assert_ne!(Kind::Page.namespace(), Kind::Part.namespace());
    }

    #[test]
    fn test_setters_are_independent() {
        let mut page = Page::new("/a", "text/html", "<p>hi</p>");
        page.set_contents("<p>bye</p>".into());
        assert_eq!(page.content_type(), "text/html");
        page.set_path("/b".into());
        assert_eq!(page.contents(), "<p>bye</p>");
        assert_eq!(page.path(), "/b");
    }
}
