//! Error types for pagestore

use thiserror::Error;

/// Result type alias for pagestore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pagestore operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotExist(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not writable: {path}: {reason}")]
    NotWritable { path: String, reason: String },

    #[error("End of sequence")]
    EndOfSequence,

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Backend {op} failed for {path}: {source}")]
    Backend {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

/// Stable, comparable classification of an [`Error`].
///
/// Callers match on kinds rather than on error values, so
/// `err.kind() == ErrorKind::NotExist` works no matter which backend or
/// operation produced the error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotExist,
    AlreadyExists,
    NotWritable,
    EndOfSequence,
    InvalidPath,
    Corruption,
    Io,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotExist(_) => ErrorKind::NotExist,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotWritable { .. } => ErrorKind::NotWritable,
            Error::EndOfSequence => ErrorKind::EndOfSequence,
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::Backend { .. } | Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_)
            | Error::Json(_)
            | Error::Corruption(_)
            | Error::VersionMismatch { .. } => ErrorKind::Corruption,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    pub fn is_end_of_sequence(&self) -> bool {
        self.kind() == ErrorKind::EndOfSequence
    }

    /// Wrap an I/O failure with the operation and path that hit it.
    pub(crate) fn backend(
        op: &'static str,
        path: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::Backend {
            op,
            path: path.into(),
            source,
        }
    }
}

impl ErrorKind {
    /// Process exit code used by the CLI
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidPath => 2,
            ErrorKind::NotExist => 3,
            ErrorKind::AlreadyExists => 4,
            ErrorKind::NotWritable => 5,
            ErrorKind::Corruption => 7,
            ErrorKind::Io => 8,
            ErrorKind::Config => 9,
            ErrorKind::EndOfSequence => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotExist => "not_exist",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotWritable => "not_writable",
            ErrorKind::EndOfSequence => "end_of_sequence",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::Corruption => "corruption",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        }
    }
}
