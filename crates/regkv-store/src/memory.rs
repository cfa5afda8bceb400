use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::{Arc, RwLock};

use tracing::{debug, error, info};

use regkv_config::{NodeConfig, RemoteAddr};
use regkv_types::Timestamp;

use crate::error::{NativeError, NativeResult};
use crate::log::NodeLog;
use crate::session::{
    GroupId, GroupReply, IndexEntry, IndexMatch, LookupInfo, SessionParams, StoreNode,
    StoreSession, WriteMode,
};

/// Largest object an offset write may produce.
pub const MAX_OBJECT_SIZE: u64 = 1 << 32;

#[derive(Clone, Debug)]
struct StoredEntry {
    data: Vec<u8>,
    timestamp: Timestamp,
}

/// Keys, payloads and index associations of one namespace in one group.
#[derive(Debug, Default)]
struct Space {
    objects: HashMap<String, StoredEntry>,
    /// index name -> key -> data
    indexes: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    /// key -> index names
    key_indexes: HashMap<String, BTreeSet<String>>,
}

impl Space {
    fn write(&mut self, key: &str, data: &[u8], offset: u64, mode: WriteMode) -> NativeResult<()> {
        let span = match mode {
            WriteMode::Overwrite if offset > 0 => Some(Self::span(key, offset, data.len())?),
            _ => None,
        };
        let timestamp = Timestamp::now();
        let entry = self
            .objects
            .entry(key.to_string())
            .or_insert_with(|| StoredEntry {
                data: Vec::new(),
                timestamp,
            });
        match (mode, span) {
            (WriteMode::Append, _) => entry.data.extend_from_slice(data),
            (WriteMode::Overwrite, Some((start, end))) => {
                if entry.data.len() < end {
                    entry.data.resize(end, 0);
                }
                entry.data[start..end].copy_from_slice(data);
            }
            (WriteMode::Overwrite, None) => entry.data = data.to_vec(),
        }
        entry.timestamp = timestamp;
        Ok(())
    }

    /// Byte span of an offset write, bounded by [`MAX_OBJECT_SIZE`].
    fn span(key: &str, offset: u64, len: usize) -> NativeResult<(usize, usize)> {
        usize::try_from(offset)
            .ok()
            .and_then(|start| Some((start, start.checked_add(len)?)))
            .filter(|&(_, end)| end as u64 <= MAX_OBJECT_SIZE)
            .ok_or_else(|| {
                NativeError::new(
                    NativeError::INVALID,
                    format!("write of {len} bytes at offset {offset} to {key:?} is out of bounds"),
                )
            })
    }

    fn read(&self, key: &str, offset: u64, size: u64) -> NativeResult<Vec<u8>> {
        let entry = self
            .objects
            .get(key)
            .ok_or_else(|| NativeError::no_entry(key))?;
        let len = entry.data.len() as u64;
        if offset > len || (offset == len && len > 0) {
            return Err(NativeError::new(
                NativeError::INVALID,
                format!("offset {offset} past the end of {key:?} ({len} bytes)"),
            ));
        }
        let end = if size == 0 { len } else { offset.saturating_add(size).min(len) };
        Ok(entry.data[offset as usize..end as usize].to_vec())
    }

    fn remove(&mut self, key: &str) -> NativeResult<()> {
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| NativeError::no_entry(key))
    }

    fn clear_indexes(&mut self, key: &str) {
        for name in self.key_indexes.remove(key).unwrap_or_default() {
            if let Some(keys) = self.indexes.get_mut(&name) {
                keys.remove(key);
                if keys.is_empty() {
                    self.indexes.remove(&name);
                }
            }
        }
    }

    fn add_indexes(&mut self, key: &str, indexes: &[String], datas: &[Vec<u8>]) {
        for (name, data) in indexes.iter().zip(datas) {
            self.indexes
                .entry(name.clone())
                .or_default()
                .insert(key.to_string(), data.clone());
            self.key_indexes
                .entry(key.to_string())
                .or_default()
                .insert(name.clone());
        }
    }

    fn find(&self, indexes: &[String]) -> Vec<IndexMatch> {
        let Some((first, rest)) = indexes.split_first() else {
            return Vec::new();
        };
        let Some(candidates) = self.indexes.get(first) else {
            return Vec::new();
        };
        candidates
            .keys()
            .filter(|key| {
                rest.iter().all(|name| {
                    self.indexes
                        .get(name)
                        .is_some_and(|keys| keys.contains_key(*key))
                })
            })
            .map(|key| IndexMatch {
                key: key.clone(),
                indexes: indexes
                    .iter()
                    .map(|name| IndexEntry {
                        index: name.clone(),
                        data: self.indexes[name][key].clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug)]
struct Group {
    online: bool,
    spaces: HashMap<String, Space>,
}

#[derive(Debug, Default)]
struct ClusterState {
    groups: BTreeMap<GroupId, Group>,
    listening: BTreeSet<RemoteAddr>,
    fail_index_updates: bool,
}

/// In-memory replicated store.
///
/// Holds a set of replica groups, each with its own copy of every namespace,
/// and a set of listening addresses that nodes can connect to. Groups can be
/// taken offline and index updates can be made to fail, which is how quorum
/// and error translation are exercised in tests.
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<RwLock<ClusterState>>,
}

impl InMemoryCluster {
    /// Create a cluster with the given groups, all online.
    pub fn new(groups: &[GroupId]) -> Self {
        let state = ClusterState {
            groups: groups
                .iter()
                .map(|&id| {
                    (
                        id,
                        Group {
                            online: true,
                            spaces: HashMap::new(),
                        },
                    )
                })
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Accept connections on `addr`.
    pub fn listen(&self, addr: RemoteAddr) {
        self.state
            .write()
            .expect("lock poisoned")
            .listening
            .insert(addr);
    }

    /// Take a group offline or bring it back. Offline groups time out.
    pub fn set_group_online(&self, group: GroupId, online: bool) {
        if let Some(g) = self
            .state
            .write()
            .expect("lock poisoned")
            .groups
            .get_mut(&group)
        {
            g.online = online;
        }
    }

    /// Make every index update and index clear fail.
    pub fn fail_index_updates(&self, fail: bool) {
        self.state.write().expect("lock poisoned").fail_index_updates = fail;
    }

    /// Create a node with the given settings. Fails when its log file
    /// cannot be opened.
    pub fn node(&self, config: &NodeConfig) -> io::Result<InMemoryNode> {
        Ok(InMemoryNode {
            cluster: self.clone(),
            config: config.clone(),
            log: NodeLog::open(config)?,
            routes: RwLock::new(BTreeSet::new()),
        })
    }

    /// Raw payload held by one group, bypassing quorum.
    pub fn raw_payload(&self, group: GroupId, namespace: &str, key: &str) -> Option<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        state
            .groups
            .get(&group)?
            .spaces
            .get(namespace)?
            .objects
            .get(key)
            .map(|entry| entry.data.clone())
    }

    /// Number of payloads one group holds in a namespace.
    pub fn object_count(&self, group: GroupId, namespace: &str) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state
            .groups
            .get(&group)
            .and_then(|g| g.spaces.get(namespace))
            .map_or(0, |space| space.objects.len())
    }

    /// Index names one group associates with `key`.
    pub fn indexes_of(&self, group: GroupId, namespace: &str, key: &str) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        state
            .groups
            .get(&group)
            .and_then(|g| g.spaces.get(namespace))
            .and_then(|space| space.key_indexes.get(key))
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Run `op` against every group of `groups`, one reply per group.
    fn fan_out<T>(
        &self,
        groups: &[GroupId],
        namespace: &str,
        mut op: impl FnMut(&mut Space) -> NativeResult<T>,
    ) -> Vec<GroupReply<T>> {
        let mut state = self.state.write().expect("lock poisoned");
        groups
            .iter()
            .map(|&id| {
                let result = match state.groups.get_mut(&id) {
                    None => Err(NativeError::new(
                        NativeError::NO_ROUTE,
                        format!("group {id} is not in the route table"),
                    )),
                    Some(group) if !group.online => Err(NativeError::new(
                        NativeError::TIMEOUT,
                        format!("group {id} timed out"),
                    )),
                    Some(group) => op(group.spaces.entry(namespace.to_string()).or_default()),
                };
                GroupReply { group: id, result }
            })
            .collect()
    }

    fn fan_out_read<T>(
        &self,
        groups: &[GroupId],
        namespace: &str,
        op: impl Fn(&Space) -> NativeResult<T>,
    ) -> Vec<GroupReply<T>> {
        let state = self.state.read().expect("lock poisoned");
        groups
            .iter()
            .map(|&id| {
                let result = match state.groups.get(&id) {
                    None => Err(NativeError::new(
                        NativeError::NO_ROUTE,
                        format!("group {id} is not in the route table"),
                    )),
                    Some(group) if !group.online => Err(NativeError::new(
                        NativeError::TIMEOUT,
                        format!("group {id} timed out"),
                    )),
                    Some(group) => match group.spaces.get(namespace) {
                        Some(space) => op(space),
                        None => op(&Space::default()),
                    },
                };
                GroupReply { group: id, result }
            })
            .collect()
    }

    fn index_update(
        &self,
        params: &SessionParams,
        op: impl Fn(&mut Space),
    ) -> Vec<GroupReply<()>> {
        let failing = self.state.read().expect("lock poisoned").fail_index_updates;
        self.fan_out(&params.groups, &params.namespace, |space| {
            if failing {
                return Err(NativeError::new(NativeError::TIMEOUT, "index update timed out"));
            }
            op(space);
            Ok(())
        })
    }
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryCluster")
            .field("groups", &state.groups.keys().collect::<Vec<_>>())
            .field("listening", &state.listening.len())
            .finish()
    }
}

/// Node connected to an [`InMemoryCluster`].
#[derive(Debug)]
pub struct InMemoryNode {
    cluster: InMemoryCluster,
    config: NodeConfig,
    log: NodeLog,
    routes: RwLock<BTreeSet<RemoteAddr>>,
}

impl InMemoryNode {
    /// Settings the node was created with.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn log(&self) -> &NodeLog {
        &self.log
    }
}

impl StoreNode for InMemoryNode {
    fn add_remote(&self, remote: &RemoteAddr) -> NativeResult<()> {
        let reachable = self
            .cluster
            .state
            .read()
            .expect("lock poisoned")
            .listening
            .contains(remote);
        if !reachable {
            self.log.scope(|| error!(%remote, "connection refused"));
            return Err(NativeError::new(
                NativeError::REFUSED,
                format!("connection to {remote} refused"),
            ));
        }
        self.routes
            .write()
            .expect("lock poisoned")
            .insert(remote.clone());
        self.log.scope(|| info!(%remote, "route added"));
        Ok(())
    }

    fn route_addresses(&self) -> Vec<RemoteAddr> {
        self.routes
            .read()
            .expect("lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn open_session(&self, params: &SessionParams) -> Arc<dyn StoreSession> {
        self.log.scope(|| {
            debug!(groups = ?params.groups, namespace = %params.namespace, "session opened")
        });
        Arc::new(InMemorySession {
            cluster: self.cluster.clone(),
            params: params.clone(),
        })
    }
}

/// Session over an [`InMemoryCluster`].
#[derive(Debug, Clone)]
pub struct InMemorySession {
    cluster: InMemoryCluster,
    params: SessionParams,
}

impl InMemorySession {
    pub fn new(cluster: InMemoryCluster, params: SessionParams) -> Self {
        Self { cluster, params }
    }
}

impl StoreSession for InMemorySession {
    fn write_data(
        &self,
        key: &str,
        data: &[u8],
        offset: u64,
        mode: WriteMode,
    ) -> Vec<GroupReply<()>> {
        self.cluster
            .fan_out(&self.params.groups, &self.params.namespace, |space| {
                space.write(key, data, offset, mode)
            })
    }

    fn read_data(&self, key: &str, offset: u64, size: u64) -> Vec<GroupReply<Vec<u8>>> {
        self.cluster
            .fan_out_read(&self.params.groups, &self.params.namespace, |space| {
                space.read(key, offset, size)
            })
    }

    fn remove(&self, key: &str) -> Vec<GroupReply<()>> {
        self.cluster
            .fan_out(&self.params.groups, &self.params.namespace, |space| {
                space.remove(key)
            })
    }

    fn set_indexes(
        &self,
        key: &str,
        indexes: &[String],
        datas: &[Vec<u8>],
    ) -> Vec<GroupReply<()>> {
        self.cluster.index_update(&self.params, |space| {
            space.clear_indexes(key);
            space.add_indexes(key, indexes, datas);
        })
    }

    fn update_indexes(
        &self,
        key: &str,
        indexes: &[String],
        datas: &[Vec<u8>],
    ) -> Vec<GroupReply<()>> {
        self.cluster.index_update(&self.params, |space| {
            space.add_indexes(key, indexes, datas);
        })
    }

    fn find_all_indexes(&self, indexes: &[String]) -> NativeResult<Vec<IndexMatch>> {
        // Served by the first reachable group.
        let replies = self
            .cluster
            .fan_out_read(&self.params.groups, &self.params.namespace, |space| {
                Ok(space.find(indexes))
            });
        let mut last_error = None;
        for reply in replies {
            match reply.result {
                Ok(matches) => return Ok(matches),
                Err(err) => last_error = Some(err),
            }
        }
        Err(last_error.unwrap_or_else(|| NativeError::new(NativeError::NO_ROUTE, "no groups")))
    }

    fn lookup(&self, key: &str) -> Vec<GroupReply<LookupInfo>> {
        self.cluster
            .fan_out_read(&self.params.groups, &self.params.namespace, |space| {
                space
                    .objects
                    .get(key)
                    .map(|entry| LookupInfo {
                        size: entry.data.len() as u64,
                        timestamp: entry.timestamp,
                    })
                    .ok_or_else(|| NativeError::no_entry(key))
            })
    }
}
