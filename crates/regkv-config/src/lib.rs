//! Configuration for the regkv storage driver.
//!
//! [`DriverConfig`] enumerates every option the driver recognizes together
//! with its default. Input is accepted from TOML (or built in code), parsed
//! into a permissive [`RawConfig`] and validated into a [`DriverConfig`].
//!
//! # Modules
//!
//! - [`error`] — [`ConfigError`]
//! - [`config`] — [`DriverConfig`], [`RawConfig`], [`NodeConfig`] and defaults
//! - [`remote`] — [`RemoteAddr`] parsing
//! - [`verbosity`] — backing store log levels

pub mod config;
pub mod error;
pub mod remote;
pub mod verbosity;

pub use config::{DriverConfig, GroupsSpec, NodeConfig, NodesSpec, RawConfig};
pub use error::{ConfigError, ConfigResult};
pub use remote::RemoteAddr;
pub use verbosity::Verbosity;
