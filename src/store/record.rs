//! Record - the on-backend encoding of a document
//!
//! Record format:
//! ```text
//! [HEADER: 45 bytes]
//!   - magic: 8 bytes ("PAGESTOR")
//!   - version: 4 bytes (u32 LE)
//!   - kind: 1 byte (0 = page, 1 = part)
//!   - checksum: 32 bytes (BLAKE3 of kind byte + body)
//!
//! [BODY: variable]
//!   - zstd-compressed bincode of (content_type, contents)
//! ```
//!
//! The path is not part of the record: the backend key is the path.

use crate::model::{Document, Kind};
use crate::{Error, Result, MAGIC, VERSION};
use serde::{Deserialize, Serialize};

pub const HEADER_SIZE: usize = 45;

/// Default zstd level for record bodies
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Serialize, Deserialize)]
struct RecordBody {
    content_type: String,
    contents: String,
}

/// The stored state of a page or part, minus its path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub kind: Kind,
    pub content_type: String,
    pub contents: String,
}

impl Record {
    pub fn new(kind: Kind, content_type: impl Into<String>, contents: impl Into<String>) -> Self {
        Record {
            kind,
            content_type: content_type.into(),
            contents: contents.into(),
        }
    }

    /// Capture the state of a document
    pub fn from_document(kind: Kind, doc: &impl Document) -> Self {
        Record::new(kind, doc.content_type(), doc.contents())
    }

    /// Move this record's state into a document stored at `path`
    pub fn fill(self, path: String, doc: &mut impl Document) {
        doc.set_path(path);
        doc.set_content_type(self.content_type);
        doc.set_contents(self.contents);
    }

    /// Encode for storage
    pub fn encode(&self, level: i32) -> Result<Vec<u8>> {
        let body = bincode::serialize(&RecordBody {
            content_type: self.content_type.clone(),
            contents: self.contents.clone(),
        })?;
        let compressed = zstd::encode_all(body.as_slice(), level)?;
        let checksum = checksum(self.kind.as_byte(), &compressed);

        let mut output = Vec::with_capacity(HEADER_SIZE + compressed.len());
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(&VERSION.to_le_bytes());
        output.push(self.kind.as_byte());
        output.extend_from_slice(checksum.as_bytes());
        output.extend(compressed);
        Ok(output)
    }

    /// Decode a stored record, verifying header and checksum
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption(format!(
                "Record too short: {} bytes",
                data.len()
            )));
        }
        if &data[0..8] != MAGIC {
            return Err(Error::Corruption("Invalid magic bytes".into()));
        }

        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&data[8..12]);
        let version = u32::from_le_bytes(version_bytes);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let kind = Kind::from_byte(data[12])
            .ok_or_else(|| Error::Corruption(format!("Invalid record kind: {}", data[12])))?;

        let body = &data[HEADER_SIZE..];
        let expected = checksum(data[12], body);
        if expected.as_bytes() != &data[13..HEADER_SIZE] {
            return Err(Error::Corruption(format!(
                "Checksum mismatch: expected {}",
                short_hex(&expected)
            )));
        }

        let decompressed = zstd::decode_all(body)?;
        let body: RecordBody = bincode::deserialize(&decompressed)?;
        Ok(Record {
            kind,
            content_type: body.content_type,
            contents: body.contents,
        })
    }
}

fn checksum(kind: u8, body: &[u8]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[kind]);
    hasher.update(body);
    hasher.finalize()
}

fn short_hex(hash: &blake3::Hash) -> String {
    hex::encode(&hash.as_bytes()[..4])
}
