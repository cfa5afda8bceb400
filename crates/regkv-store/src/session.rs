//! Interface of the backing store, as consumed by [`QuorumClient`](crate::QuorumClient).
//!
//! A [`StoreNode`] owns connections to remote endpoints and a route table.
//! A [`StoreSession`] binds a node to a set of replica groups and a
//! namespace; its calls fan out to every bound group and return one reply per
//! group. Deciding whether enough groups succeeded is left to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use regkv_config::RemoteAddr;
use regkv_types::Timestamp;

use crate::error::NativeResult;

/// Replica group identifier.
pub type GroupId = u32;

/// Outcome of one call against one replica group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupReply<T> {
    pub group: GroupId,
    pub result: NativeResult<T>,
}

impl<T> GroupReply<T> {
    pub fn ok(group: GroupId, value: T) -> Self {
        Self {
            group,
            result: Ok(value),
        }
    }
}

/// How a write lands on an existing object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteMode {
    /// Write at the given offset. Offset zero replaces the object.
    #[default]
    Overwrite,
    /// Append to the end of the object; the offset is ignored.
    Append,
}

/// One index association of a matched key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub index: String,
    pub data: Vec<u8>,
}

/// A key carrying every index named in a find request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexMatch {
    pub key: String,
    /// Associations in request order.
    pub indexes: Vec<IndexEntry>,
}

/// Metadata reported by a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupInfo {
    pub size: u64,
    pub timestamp: Timestamp,
}

/// Parameters bound to a session for its whole life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub groups: Vec<GroupId>,
    pub namespace: String,
}

impl SessionParams {
    pub fn new(groups: Vec<GroupId>, namespace: impl Into<String>) -> Self {
        Self {
            groups,
            namespace: namespace.into(),
        }
    }
}

/// Connection manager of the backing store.
pub trait StoreNode: Send + Sync {
    /// Connect to a remote endpoint and add it to the route table.
    fn add_remote(&self, remote: &RemoteAddr) -> NativeResult<()>;

    /// Endpoints currently in the route table.
    fn route_addresses(&self) -> Vec<RemoteAddr>;

    /// Open a session bound to `params`.
    fn open_session(&self, params: &SessionParams) -> Arc<dyn StoreSession>;
}

/// Data plane of the backing store. Calls block until every bound group has
/// replied or timed out.
pub trait StoreSession: Send + Sync {
    /// Write `data` under `key`.
    fn write_data(
        &self,
        key: &str,
        data: &[u8],
        offset: u64,
        mode: WriteMode,
    ) -> Vec<GroupReply<()>>;

    /// Read `size` bytes of `key` starting at `offset`. `size == 0` reads to
    /// the end.
    fn read_data(&self, key: &str, offset: u64, size: u64) -> Vec<GroupReply<Vec<u8>>>;

    /// Remove the payload of `key`. Index associations are untouched.
    fn remove(&self, key: &str) -> Vec<GroupReply<()>>;

    /// Replace every index association of `key` with `indexes`.
    /// Empty slices clear them all.
    fn set_indexes(&self, key: &str, indexes: &[String], datas: &[Vec<u8>])
        -> Vec<GroupReply<()>>;

    /// Add or refresh the named associations of `key`, keeping the others.
    fn update_indexes(
        &self,
        key: &str,
        indexes: &[String],
        datas: &[Vec<u8>],
    ) -> Vec<GroupReply<()>>;

    /// Keys associated with every one of `indexes`.
    fn find_all_indexes(&self, indexes: &[String]) -> NativeResult<Vec<IndexMatch>>;

    /// Size and modification time of `key`.
    fn lookup(&self, key: &str) -> Vec<GroupReply<LookupInfo>>;
}
