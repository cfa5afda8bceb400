//! Log stream of a backing store node.
//!
//! A node logs through its own `tracing` subscriber, filtered by the
//! configured verbosity and written to the configured log file. It does not
//! share the application's global subscriber.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use regkv_config::{NodeConfig, Verbosity};

/// Log file name that selects the process's standard error.
pub const STDERR_LOGFILE: &str = "/dev/stderr";

/// Subscriber owned by one node.
#[derive(Clone)]
pub struct NodeLog {
    dispatch: Dispatch,
    level: Verbosity,
}

impl NodeLog {
    /// Open the log file named by `config` for appending, creating it if
    /// needed, and filter at `config.log_level`.
    pub fn open(config: &NodeConfig) -> io::Result<Self> {
        let writer = if config.logfile == Path::new(STDERR_LOGFILE) {
            BoxMakeWriter::new(io::stderr)
        } else {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.logfile)?;
            BoxMakeWriter::new(Mutex::new(file))
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(config.log_level.tracing_level())
            .with_ansi(false)
            .with_writer(writer)
            .finish();
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            level: config.log_level,
        })
    }

    pub fn level(&self) -> Verbosity {
        self.level
    }

    /// Run `f` with this stream as the current subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl std::fmt::Debug for NodeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLog").field("level", &self.level).finish()
    }
}
