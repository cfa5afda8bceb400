use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid byte range: end {end} is before start {start}")]
    InvalidRange { start: u64, end: u64 },

    #[error("path {0:?} is not a valid leaf target")]
    RootPath(String),
}
