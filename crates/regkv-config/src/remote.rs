//! Remote endpoint addresses.
//!
//! Accepted forms:
//! - `host:port` (family defaults to IPv4)
//! - `host:port:family`
//! - `host:port:family-N` (anything after `-` is ignored)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// `AF_INET`.
pub const DEFAULT_FAMILY: u16 = 2;

/// A backing store endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteAddr {
    pub host: String,
    pub port: u16,
    pub family: u16,
}

impl RemoteAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            family: DEFAULT_FAMILY,
        }
    }

    /// Parse a whitespace-delimited list of endpoints.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, ConfigError> {
        text.split_whitespace().map(str::parse).collect()
    }
}

impl FromStr for RemoteAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidRemote {
            remote: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        let (host, port, family) = match parts.as_slice() {
            [host, port] => (*host, *port, None),
            [host, port, family] => (*host, *port, Some(*family)),
            _ => return Err(invalid("expected host:port[:family]")),
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
        let family = match family {
            None => DEFAULT_FAMILY,
            Some(raw) => {
                let raw = raw.split_once('-').map_or(raw, |(family, _)| family);
                raw.parse::<u16>()
                    .map_err(|_| invalid("family is not a number"))?
            }
        };

        Ok(Self {
            host: host.to_string(),
            port,
            family,
        })
    }
}

impl TryFrom<String> for RemoteAddr {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RemoteAddr> for String {
    fn from(addr: RemoteAddr) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.host, self.port, self.family)
    }
}
