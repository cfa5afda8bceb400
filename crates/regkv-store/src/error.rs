use std::fmt;

use thiserror::Error;

/// Failure reported by the backing store, errno style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeError {
    pub code: i32,
    pub message: String,
}

impl NativeError {
    /// No such key.
    pub const NO_ENTRY: i32 = -2;
    /// Group or route unavailable.
    pub const NO_ROUTE: i32 = -6;
    /// Malformed request, e.g. a read offset past the end.
    pub const INVALID: i32 = -22;
    /// Remote refused the connection.
    pub const REFUSED: i32 = -111;
    /// Operation did not complete within the wait timeout.
    pub const TIMEOUT: i32 = -110;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_entry(key: &str) -> Self {
        Self::new(Self::NO_ENTRY, format!("no such key {key:?}"))
    }

    pub fn is_no_entry(&self) -> bool {
        self.code == Self::NO_ENTRY
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for NativeError {}

/// Result alias for raw store calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// Errors surfaced by [`QuorumClient`](crate::QuorumClient).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is absent, or could not be read/removed from a quorum.
    #[error("no such key {key:?}")]
    NotFound { key: String },

    /// A payload write was not acknowledged by a quorum of groups.
    #[error("writing {key:?} failed: {acked}/{required} groups acknowledged: {reason}")]
    WriteFailed {
        key: String,
        acked: usize,
        required: usize,
        reason: String,
    },

    /// An index update was not acknowledged by a quorum of groups.
    #[error("index update for {key:?} failed: {acked}/{required} groups acknowledged: {reason}")]
    IndexUpdateFailed {
        key: String,
        acked: usize,
        required: usize,
        reason: String,
    },

    /// A tag lookup could not be served.
    #[error("index lookup failed: {0}")]
    FindFailed(String),

    /// No remote endpoint became reachable.
    #[error("unable to connect to the store: {0}")]
    Connection(String),
}

impl StoreError {
    pub fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for quorum client operations.
pub type StoreResult<T> = Result<T, StoreError>;
