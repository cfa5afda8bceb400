use thiserror::Error;

use regkv_config::ConfigError;
use regkv_store::StoreError;
use regkv_types::TypeError;

/// Errors returned by the driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The path does not exist.
    #[error("no such file or directory: {0:?}")]
    NotFound(String),

    /// The root was used where an entry is required.
    #[error("invalid path {0:?}: the root is not a valid target")]
    InvalidPath(String),

    /// A byte range or other argument is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] TypeError),

    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No remote endpoint became reachable.
    #[error("connection error: {0}")]
    Connection(String),

    /// A write, index update or lookup did not reach quorum.
    #[error("store operation failed: {0}")]
    Operation(StoreError),

    /// Reading the upload source failed. Everything before `written` bytes
    /// is stored; nothing is rolled back.
    #[error("reading upload source for {path:?} failed after {written} bytes: {source}")]
    SourceRead {
        path: String,
        written: u64,
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for DriverError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound(key),
            StoreError::Connection(reason) => Self::Connection(reason),
            other => Self::Operation(other),
        }
    }
}

/// Result alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
