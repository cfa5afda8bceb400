use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Log level of the backing store's own logger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Error,
    Warning,
    Info,
    Notice,
    Debug,
}

impl Verbosity {
    /// Every recognized level, least verbose first.
    pub const ALL: [Verbosity; 5] = [
        Self::Error,
        Self::Warning,
        Self::Info,
        Self::Notice,
        Self::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Debug => "debug",
        }
    }

    /// Comma-separated list of the recognized names.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Verbosity::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Equivalent `tracing` level for the store log stream.
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warning => tracing::Level::WARN,
            Self::Info | Self::Notice => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
        }
    }
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == lowered)
            .ok_or_else(|| ConfigError::InvalidVerbosity {
                level: lowered,
                allowed: Self::names(),
            })
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("DEBUG".parse::<Verbosity>().unwrap(), Verbosity::Debug);
        assert_eq!("Notice".parse::<Verbosity>().unwrap(), Verbosity::Notice);
    }

    #[test]
    fn unknown_level_lists_allowed_names() {
        let err = "chatty".parse::<Verbosity>().unwrap_err();
        match err {
            ConfigError::InvalidVerbosity { level, allowed } => {
                assert_eq!(level, "chatty");
                assert_eq!(allowed, "error,warning,info,notice,debug");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_is_error() {
        assert_eq!(Verbosity::default(), Verbosity::Error);
    }

    #[test]
    fn maps_to_tracing_levels() {
        assert_eq!(Verbosity::Warning.tracing_level(), tracing::Level::WARN);
        assert_eq!(Verbosity::Notice.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Verbosity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
