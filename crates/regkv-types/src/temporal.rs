use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp reported by store lookups.
///
/// Ordering: `tsec` then `tnsec`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since UNIX epoch.
    pub tsec: u64,
    /// Nanoseconds within the second.
    pub tnsec: u32,
}

impl Timestamp {
    pub fn new(tsec: u64, tnsec: u32) -> Self {
        Self { tsec, tnsec }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            tsec: elapsed.as_secs(),
            tnsec: elapsed.subsec_nanos(),
        }
    }

    /// The epoch.
    pub const fn zero() -> Self {
        Self { tsec: 0, tnsec: 0 }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}.{:09})", self.tsec, self.tnsec)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.tsec, self.tnsec)
    }
}
