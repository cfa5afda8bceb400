use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Inclusive byte range `[start, end]` for ranged reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: u64, end: u64) -> Result<Self, TypeError> {
        if end < start {
            return Err(TypeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Read offset for the store.
    pub fn offset(&self) -> u64 {
        self.start
    }

    /// Number of bytes covered, saturating at `u64::MAX` for `[0, u64::MAX]`.
    /// Never zero, so it never means "to the end".
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Always `false`: an inclusive range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.start, self.end)
    }
}
