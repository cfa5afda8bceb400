//! Majority acceptance of per-group replies.

use tracing::warn;

use crate::error::NativeError;
use crate::session::GroupReply;

/// Acknowledgements required out of `groups`: more than half.
///
/// 1 group needs 1, 3 groups need 2, 4 groups need 3.
pub fn quorum(groups: usize) -> usize {
    groups / 2 + 1
}

/// Replies that reached quorum.
#[derive(Debug)]
pub(crate) struct Accepted<T> {
    /// First successful value, in reply order.
    pub value: T,
    pub acked: usize,
}

/// Replies that fell short of quorum.
#[derive(Debug)]
pub(crate) struct Rejected {
    pub acked: usize,
    pub required: usize,
    /// First failure, if any group failed outright.
    pub error: Option<NativeError>,
}

impl Rejected {
    pub fn reason(&self) -> String {
        match &self.error {
            Some(err) => err.to_string(),
            None => "no replies".to_string(),
        }
    }

    /// Every failing group reported the key as absent.
    pub fn is_no_entry(&self) -> bool {
        self.error.as_ref().is_some_and(NativeError::is_no_entry)
    }
}

/// Count successes and accept once `required` groups succeeded.
pub(crate) fn check<T>(
    op: &str,
    key: &str,
    replies: Vec<GroupReply<T>>,
    required: usize,
) -> Result<Accepted<T>, Rejected> {
    let mut value = None;
    let mut acked = 0;
    let mut error = None;

    for reply in replies {
        match reply.result {
            Ok(v) => {
                acked += 1;
                if value.is_none() {
                    value = Some(v);
                }
            }
            Err(err) => {
                if !err.is_no_entry() {
                    warn!(op, key, group = reply.group, error = %err, "group reply failed");
                }
                if error.is_none() {
                    error = Some(err);
                }
            }
        }
    }

    match value {
        Some(value) if acked >= required => Ok(Accepted { value, acked }),
        _ => Err(Rejected {
            acked,
            required,
            error,
        }),
    }
}
