use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The replica group list is present but empty.
    #[error("groups must be specified")]
    EmptyGroups,

    /// The replica group list could not be parsed.
    #[error("invalid groups specification {0:?}")]
    InvalidGroups(String),

    /// No remote endpoints were configured.
    #[error("nodes must be specified")]
    MissingNodes,

    /// The remote endpoint list is present but empty.
    #[error("nodes must not be empty")]
    EmptyNodes,

    /// A remote endpoint is malformed.
    #[error("invalid remote {remote:?}: {reason}")]
    InvalidRemote { remote: String, reason: String },

    /// The store log level is not one of the recognized names.
    #[error("invalid log level {level}. Use one of {allowed}")]
    InvalidVerbosity { level: String, allowed: String },

    /// Streaming needs a non-zero chunk size.
    #[error("buffer_size must be greater than zero")]
    ZeroBufferSize,

    /// The configuration document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
