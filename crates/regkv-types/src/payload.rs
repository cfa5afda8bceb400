//! Payload conventions.
//!
//! The store has no type field, so two payloads are told apart by content:
//! directory markers hold [`DIRECTORY_MARKER`], everything else is ordinary
//! content. Empty content is stored as [`EMPTY_SENTINEL`] because the store
//! cannot tell a zero-length object from a missing one.

use serde::{Deserialize, Serialize};

/// Content of a synthetic directory entry.
pub const DIRECTORY_MARKER: &[u8] = b"DIRECTORY";

/// Content stored in place of an empty body.
pub const EMPTY_SENTINEL: &[u8] = b"EMPTY";

/// What a stored payload represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Directory,
    File,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Body actually written for `content`.
pub fn stored_body(content: &[u8]) -> &[u8] {
    if content.is_empty() {
        EMPTY_SENTINEL
    } else {
        content
    }
}

/// Size check done before fetching content: only payloads of exactly the
/// marker length can be directory markers.
pub fn may_be_directory(size: u64) -> bool {
    size == DIRECTORY_MARKER.len() as u64
}

/// Classify a stored payload.
pub fn classify(data: &[u8]) -> PayloadKind {
    if data == DIRECTORY_MARKER {
        PayloadKind::Directory
    } else {
        PayloadKind::File
    }
}
