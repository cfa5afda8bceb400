use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::remote::RemoteAddr;
use crate::verbosity::Verbosity;

pub const DEFAULT_NAMESPACE: &str = "DOCKER";
pub const DEFAULT_INDEX_NAMESPACE: &str = "docker";
pub const DEFAULT_GROUPS: [u32; 1] = [1];
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_IO_THREAD_NUM: usize = 2;
pub const DEFAULT_NET_THREAD_NUM: usize = 2;
pub const DEFAULT_NONBLOCKING_IO_THREAD_NUM: usize = 2;
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;
pub const DEFAULT_LOGFILE: &str = "/dev/stderr";

/// Replica groups as written in a configuration document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupsSpec {
    List(Vec<u32>),
    /// `"[1,2,3]"` or `"1, 2, 3"`.
    Text(String),
}

impl GroupsSpec {
    fn into_groups(self) -> ConfigResult<Vec<u32>> {
        let groups = match self {
            Self::List(groups) => groups,
            Self::Text(text) => {
                let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse::<u32>()
                            .map_err(|_| ConfigError::InvalidGroups(text.clone()))
                    })
                    .collect::<ConfigResult<Vec<u32>>>()?
            }
        };
        if groups.is_empty() {
            return Err(ConfigError::EmptyGroups);
        }
        Ok(groups)
    }
}

/// Remote endpoints as written in a configuration document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodesSpec {
    List(Vec<String>),
    /// Whitespace-delimited.
    Text(String),
}

impl NodesSpec {
    fn into_remotes(self) -> ConfigResult<Vec<RemoteAddr>> {
        let remotes = match self {
            Self::List(items) => items
                .iter()
                .map(|item| item.parse())
                .collect::<ConfigResult<Vec<RemoteAddr>>>()?,
            Self::Text(text) => RemoteAddr::parse_list(&text)?,
        };
        if remotes.is_empty() {
            return Err(ConfigError::EmptyNodes);
        }
        Ok(remotes)
    }
}

/// Configuration as read from a document: every option optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub groups: Option<GroupsSpec>,
    pub nodes: Option<NodesSpec>,
    pub namespace: Option<String>,
    pub index_namespace: Option<String>,
    pub verbosity: Option<String>,
    pub logfile: Option<PathBuf>,
    /// Seconds.
    pub wait_timeout: Option<u64>,
    /// Seconds.
    pub check_timeout: Option<u64>,
    pub io_thread_num: Option<usize>,
    pub net_thread_num: Option<usize>,
    pub nonblocking_io_thread_num: Option<usize>,
    pub buffer_size: Option<usize>,
}

impl RawConfig {
    /// Apply defaults and validate.
    pub fn into_config(self) -> ConfigResult<DriverConfig> {
        let groups = match self.groups {
            Some(spec) => spec.into_groups()?,
            None => DEFAULT_GROUPS.to_vec(),
        };
        let nodes = self
            .nodes
            .ok_or(ConfigError::MissingNodes)?
            .into_remotes()?;
        let verbosity = match self.verbosity {
            Some(level) => level.parse()?,
            None => Verbosity::default(),
        };

        let config = DriverConfig {
            groups,
            nodes,
            namespace: self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            index_namespace: self
                .index_namespace
                .unwrap_or_else(|| DEFAULT_INDEX_NAMESPACE.into()),
            verbosity,
            logfile: self.logfile.unwrap_or_else(|| PathBuf::from(DEFAULT_LOGFILE)),
            wait_timeout: self
                .wait_timeout
                .map_or(DEFAULT_WAIT_TIMEOUT, Duration::from_secs),
            check_timeout: self
                .check_timeout
                .map_or(DEFAULT_CHECK_TIMEOUT, Duration::from_secs),
            io_thread_num: self.io_thread_num.unwrap_or(DEFAULT_IO_THREAD_NUM),
            net_thread_num: self.net_thread_num.unwrap_or(DEFAULT_NET_THREAD_NUM),
            nonblocking_io_thread_num: self
                .nonblocking_io_thread_num
                .unwrap_or(DEFAULT_NONBLOCKING_IO_THREAD_NUM),
            buffer_size: self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Validated driver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Replica groups every operation is sent to.
    pub groups: Vec<u32>,
    /// Remote endpoints used to bootstrap the route table.
    pub nodes: Vec<RemoteAddr>,
    /// Store namespace isolating this driver's keys.
    pub namespace: String,
    /// Namespace component of every index tag.
    pub index_namespace: String,
    /// Backing store log level.
    pub verbosity: Verbosity,
    /// Backing store log destination.
    pub logfile: PathBuf,
    /// Time to wait for an operation to complete.
    pub wait_timeout: Duration,
    /// Node ping timeout.
    pub check_timeout: Duration,
    pub io_thread_num: usize,
    pub net_thread_num: usize,
    pub nonblocking_io_thread_num: usize,
    /// Streaming chunk size in bytes.
    pub buffer_size: usize,
}

impl DriverConfig {
    /// A configuration with every default and the given remotes.
    pub fn with_nodes(nodes: Vec<RemoteAddr>) -> Self {
        Self {
            groups: DEFAULT_GROUPS.to_vec(),
            nodes,
            namespace: DEFAULT_NAMESPACE.into(),
            index_namespace: DEFAULT_INDEX_NAMESPACE.into(),
            verbosity: Verbosity::default(),
            logfile: PathBuf::from(DEFAULT_LOGFILE),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            io_thread_num: DEFAULT_IO_THREAD_NUM,
            net_thread_num: DEFAULT_NET_THREAD_NUM,
            nonblocking_io_thread_num: DEFAULT_NONBLOCKING_IO_THREAD_NUM,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.into_config()
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the invariants of a configuration built in code.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.groups.is_empty() {
            return Err(ConfigError::EmptyGroups);
        }
        if self.nodes.is_empty() {
            return Err(ConfigError::EmptyNodes);
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Settings handed to the backing store node.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            wait_timeout: self.wait_timeout,
            check_timeout: self.check_timeout,
            io_thread_num: self.io_thread_num,
            net_thread_num: self.net_thread_num,
            nonblocking_io_thread_num: self.nonblocking_io_thread_num,
            log_level: self.verbosity,
            logfile: self.logfile.clone(),
        }
    }
}

/// Backing store node settings: timeouts, thread pools and logging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub wait_timeout: Duration,
    pub check_timeout: Duration,
    pub io_thread_num: usize,
    pub net_thread_num: usize,
    pub nonblocking_io_thread_num: usize,
    pub log_level: Verbosity,
    pub logfile: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            io_thread_num: DEFAULT_IO_THREAD_NUM,
            net_thread_num: DEFAULT_NET_THREAD_NUM,
            nonblocking_io_thread_num: DEFAULT_NONBLOCKING_IO_THREAD_NUM,
            log_level: Verbosity::default(),
            logfile: PathBuf::from(DEFAULT_LOGFILE),
        }
    }
}
