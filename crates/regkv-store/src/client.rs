use std::sync::Arc;

use tracing::{debug, error, info, warn};

use regkv_config::DriverConfig;
use regkv_types::{Tag, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::quorum::{check, quorum};
use crate::session::{SessionParams, StoreNode, StoreSession, WriteMode};

/// Size and modification time of a stored entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub timestamp: Timestamp,
}

/// Quorum-checked client over a backing store session.
///
/// Every method is one blocking round trip. Replies are accepted once a
/// majority of the bound groups succeeded; anything less is an error. Native
/// store codes never leave this type.
pub struct QuorumClient {
    session: Arc<dyn StoreSession>,
    params: SessionParams,
    required: usize,
}

impl std::fmt::Debug for QuorumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuorumClient")
            .field("groups", &self.params.groups)
            .field("namespace", &self.params.namespace)
            .field("required", &self.required)
            .finish()
    }
}

impl QuorumClient {
    /// Bootstrap the node's route table from the configured remotes and open
    /// a session.
    ///
    /// A remote that cannot be added is logged and skipped. Fails only when
    /// the route table is still empty after every remote was tried.
    pub fn connect(node: &dyn StoreNode, config: &DriverConfig) -> StoreResult<Self> {
        for remote in &config.nodes {
            debug!(%remote, "adding remote");
            match node.add_remote(remote) {
                Ok(()) => info!(%remote, "remote added"),
                Err(err) => error!(%remote, error = %err, "failed to add remote"),
            }
        }

        if node.route_addresses().is_empty() {
            return Err(StoreError::Connection(format!(
                "none of {} configured remotes is reachable",
                config.nodes.len()
            )));
        }

        info!(namespace = %config.namespace, "using namespace");
        let params = SessionParams::new(config.groups.clone(), config.namespace.clone());
        let session = node.open_session(&params);
        Ok(Self::from_session(session, params))
    }

    /// Wrap an already open session.
    pub fn from_session(session: Arc<dyn StoreSession>, params: SessionParams) -> Self {
        let required = quorum(params.groups.len());
        Self {
            session,
            params,
            required,
        }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Acknowledgements needed per operation.
    pub fn required_acks(&self) -> usize {
        self.required
    }

    /// Replace the payload of `key` with `data`.
    pub fn write(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        self.write_at(key, data, 0, WriteMode::Overwrite)
    }

    /// Append `data` to the payload of `key`.
    pub fn append(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        self.write_at(key, data, 0, WriteMode::Append)
    }

    pub fn write_at(&self, key: &str, data: &[u8], offset: u64, mode: WriteMode) -> StoreResult<()> {
        debug!(key, len = data.len(), offset, ?mode, "write");
        let replies = self.session.write_data(key, data, offset, mode);
        check("write", key, replies, self.required)
            .map(|accepted| debug!(key, acked = accepted.acked, "write acknowledged"))
            .map_err(|rejected| StoreError::WriteFailed {
                key: key.to_string(),
                acked: rejected.acked,
                required: rejected.required,
                reason: rejected.reason(),
            })
    }

    /// Read `size` bytes at `offset`; `size == 0` reads to the end.
    pub fn read(&self, key: &str, offset: u64, size: u64) -> StoreResult<Vec<u8>> {
        debug!(key, offset, size, "read");
        let replies = self.session.read_data(key, offset, size);
        match check("read", key, replies, self.required) {
            Ok(accepted) => Ok(accepted.value),
            Err(rejected) => {
                if !rejected.is_no_entry() {
                    warn!(key, acked = rejected.acked, required = rejected.required, reason = %rejected.reason(), "read below quorum");
                }
                Err(StoreError::not_found(key))
            }
        }
    }

    /// Remove the payload of `key`, then clear its index associations.
    ///
    /// Both steps are always attempted. Either failing surfaces as
    /// `NotFound`, the payload failure being the one logged first.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        debug!(key, "remove");
        let payload = check("remove", key, self.session.remove(key), self.required);
        if let Err(rejected) = &payload {
            warn!(key, reason = %rejected.reason(), "unable to remove key");
        }

        let indexes = check(
            "clear indexes",
            key,
            self.session.set_indexes(key, &[], &[]),
            self.required,
        );
        if let Err(rejected) = &indexes {
            warn!(key, reason = %rejected.reason(), "unable to remove key indexes");
        }

        if payload.is_err() || indexes.is_err() {
            return Err(StoreError::not_found(key));
        }
        Ok(())
    }

    /// Replace every index association of `key`.
    pub fn set_indexes(&self, key: &str, indexes: &[String], values: &[Vec<u8>]) -> StoreResult<()> {
        let replies = self.session.set_indexes(key, indexes, values);
        self.index_result(key, check("set indexes", key, replies, self.required))
    }

    /// Add or refresh index associations of `key`, keeping the others.
    pub fn update_indexes(
        &self,
        key: &str,
        indexes: &[String],
        values: &[Vec<u8>],
    ) -> StoreResult<()> {
        let replies = self.session.update_indexes(key, indexes, values);
        self.index_result(key, check("update indexes", key, replies, self.required))
    }

    /// Index `key` under `tag`. The key itself is stored as the index value,
    /// which is what [`find_by_tag`](Self::find_by_tag) returns.
    pub fn tag(&self, key: &str, tag: &Tag) -> StoreResult<()> {
        debug!(key, %tag, "tag");
        self.update_indexes(key, &[tag.index_name()], &[key.as_bytes().to_vec()])
    }

    /// Keys indexed under `tag`. Unordered.
    pub fn find_by_tag(&self, tag: &Tag) -> StoreResult<Vec<String>> {
        let matches = self
            .session
            .find_all_indexes(&[tag.index_name()])
            .map_err(|err| StoreError::FindFailed(err.to_string()))?;
        Ok(matches
            .into_iter()
            .filter_map(|m| {
                let first = m.indexes.into_iter().next()?;
                Some(String::from_utf8_lossy(&first.data).into_owned())
            })
            .collect())
    }

    /// One key list per tag, in request order.
    pub fn find_by_tags(&self, tags: &[Tag]) -> StoreResult<Vec<Vec<String>>> {
        tags.iter().map(|tag| self.find_by_tag(tag)).collect()
    }

    /// Size and modification time of `key`.
    pub fn lookup_metadata(&self, key: &str) -> StoreResult<Metadata> {
        let replies = self.session.lookup(key);
        check("lookup", key, replies, self.required)
            .map(|accepted| Metadata {
                size: accepted.value.size,
                timestamp: accepted.value.timestamp,
            })
            .map_err(|_| StoreError::not_found(key))
    }

    fn index_result<T>(
        &self,
        key: &str,
        outcome: Result<crate::quorum::Accepted<T>, crate::quorum::Rejected>,
    ) -> StoreResult<()> {
        outcome
            .map(|_| ())
            .map_err(|rejected| StoreError::IndexUpdateFailed {
                key: key.to_string(),
                acked: rejected.acked,
                required: rejected.required,
                reason: rejected.reason(),
            })
    }
}
