use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use regkv_config::DriverConfig;
use regkv_store::{QuorumClient, StoreNode};
use regkv_types::{
    classify, is_root, may_be_directory, parent_tag, ByteRange, PayloadKind, Tag, Timestamp,
};

use crate::error::{DriverError, DriverResult};
use crate::indexer::DirectoryIndexer;
use crate::stream::{ChunkStream, StreamWriter};

/// Attributes of a stored entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttributes {
    pub size: u64,
    pub modified: Timestamp,
    pub kind: PayloadKind,
}

/// Keys listed under a directory. Unordered.
#[derive(Debug)]
pub struct DirectoryListing {
    keys: std::vec::IntoIter<String>,
}

impl Iterator for DirectoryListing {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for DirectoryListing {}

/// Path-addressed storage driver.
///
/// Owns one [`QuorumClient`], created at construction and shared by every
/// operation. All methods take `&self` and may be called from several
/// threads; writes to the same path race and the last one wins.
pub struct Driver {
    client: QuorumClient,
    config: DriverConfig,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("client", &self.client)
            .field("index_namespace", &self.config.index_namespace)
            .field("buffer_size", &self.config.buffer_size)
            .finish()
    }
}

impl Driver {
    /// Validate `config`, connect `node` to the configured remotes and bind
    /// a session.
    pub fn connect(node: &dyn StoreNode, config: DriverConfig) -> DriverResult<Self> {
        config.validate()?;
        let client = QuorumClient::connect(node, &config)?;
        Ok(Self::from_client(client, config))
    }

    /// Use an already connected client.
    pub fn from_client(client: QuorumClient, config: DriverConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn client(&self) -> &QuorumClient {
        &self.client
    }

    /// Streaming chunk size.
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    /// Ranged reads are supported.
    pub fn supports_bytes_range(&self) -> bool {
        true
    }

    fn namespace(&self) -> &str {
        &self.config.index_namespace
    }

    fn indexer(&self) -> DirectoryIndexer<'_> {
        DirectoryIndexer::new(&self.client, self.namespace())
    }

    fn children_tag(&self, path: &str) -> Tag {
        Tag::new(self.namespace(), path)
    }

    // ---- Content ----

    /// Whole content of `path`. Any read failure is reported as `NotFound`.
    pub fn get_content(&self, path: &str) -> DriverResult<Vec<u8>> {
        debug!(path, "get_content");
        self.client
            .read(path, 0, 0)
            .map_err(|_| DriverError::NotFound(path.to_string()))
    }

    /// Store `content` at `path`, replacing what was there, and create the
    /// directory structure above it. Returns the path.
    pub fn put_content(&self, path: &str, content: &[u8]) -> DriverResult<String> {
        debug!(path, len = content.len(), "put_content");
        self.indexer().put_entry(path, content)?;
        Ok(path.to_string())
    }

    /// Upload `source` to `path` in chunks of [`buffer_size`](Self::buffer_size).
    pub fn stream_write(&self, path: &str, source: &mut dyn Read) -> DriverResult<u64> {
        StreamWriter::new(&self.client, self.namespace(), self.config.buffer_size)
            .write(path, source)
    }

    /// Content of `path`, whole or restricted to `range`, as a single-chunk
    /// stream. Fails with `NotFound` up front if `path` does not exist.
    pub fn stream_read(
        &self,
        path: &str,
        range: Option<ByteRange>,
    ) -> DriverResult<ChunkStream<'_>> {
        debug!(path, range = ?range, "stream_read");
        if !self.exists(path)? {
            return Err(DriverError::NotFound(path.to_string()));
        }
        Ok(ChunkStream::new(&self.client, path, range))
    }

    // ---- Structure ----

    /// Whether `path` is listed under its parent. The root always exists.
    pub fn exists(&self, path: &str) -> DriverResult<bool> {
        if is_root(path) {
            return Ok(true);
        }
        let siblings = self.client.find_by_tag(&parent_tag(self.namespace(), path))?;
        let found = siblings.iter().any(|key| key == path);
        debug!(path, found, "exists");
        Ok(found)
    }

    /// Keys directly under `path`. Fails with `NotFound` if a non-root
    /// `path` does not exist.
    pub fn list_directory(&self, path: &str) -> DriverResult<DirectoryListing> {
        if !is_root(path) && !self.exists(path)? {
            return Err(DriverError::NotFound(path.to_string()));
        }
        let keys = self.client.find_by_tag(&self.children_tag(path))?;
        debug!(path, count = keys.len(), "list_directory");
        Ok(DirectoryListing {
            keys: keys.into_iter(),
        })
    }

    /// Remove `path` and everything indexed below it.
    ///
    /// Descendants that turn out to be already gone are logged and skipped.
    /// `NotFound` for `path` itself is returned to the caller.
    pub fn remove(&self, path: &str) -> DriverResult<()> {
        if is_root(path) {
            return Err(DriverError::InvalidPath(path.to_string()));
        }
        self.remove_tree(path)
    }

    fn remove_tree(&self, path: &str) -> DriverResult<()> {
        let children = self.client.find_by_tag(&self.children_tag(path))?;
        for child in &children {
            match self.remove_tree(child) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    warn!(path, child = %child, error = %err, "child already removed");
                }
                Err(err) => return Err(err),
            }
        }
        debug!(path, children = children.len(), "remove");
        self.client.remove(path)?;
        Ok(())
    }

    // ---- Attributes ----

    /// Stored size of `path` in bytes.
    pub fn get_size(&self, path: &str) -> DriverResult<u64> {
        let size = self.client.lookup_metadata(path)?.size;
        debug!(path, size, "get_size");
        Ok(size)
    }

    /// Size, modification time and kind of `path`.
    ///
    /// Only entries whose size matches the directory marker are read to
    /// check their content.
    pub fn stat(&self, path: &str) -> DriverResult<EntryAttributes> {
        if is_root(path) {
            return Ok(EntryAttributes {
                size: 0,
                modified: Timestamp::zero(),
                kind: PayloadKind::Directory,
            });
        }
        let meta = self.client.lookup_metadata(path)?;
        let kind = if may_be_directory(meta.size) {
            classify(&self.get_content(path)?)
        } else {
            PayloadKind::File
        };
        Ok(EntryAttributes {
            size: meta.size,
            modified: meta.timestamp,
            kind,
        })
    }

    /// Whether `path` holds a directory marker.
    pub fn is_directory(&self, path: &str) -> DriverResult<bool> {
        Ok(self.stat(path)?.kind == PayloadKind::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regkv_config::{ConfigError, RemoteAddr};
    use regkv_store::InMemoryCluster;
    use regkv_types::{DIRECTORY_MARKER, EMPTY_SENTINEL};
    use std::io::Cursor;

    const REMOTE: &str = "store-1:1025:2";

    fn config(groups: &[u32]) -> DriverConfig {
        let mut config = DriverConfig::with_nodes(vec![REMOTE.parse().unwrap()]);
        config.groups = groups.to_vec();
        config
    }

    fn fixture_with(config: DriverConfig) -> (InMemoryCluster, Driver) {
        let cluster = InMemoryCluster::new(&config.groups);
        for remote in &config.nodes {
            cluster.listen(remote.clone());
        }
        let node = cluster.node(&config.node_config()).unwrap();
        let driver = Driver::connect(&node, config).unwrap();
        (cluster, driver)
    }

    fn fixture() -> (InMemoryCluster, Driver) {
        fixture_with(config(&[1, 2, 3]))
    }

    fn listing(driver: &Driver, path: &str) -> Vec<String> {
        let mut keys: Vec<String> = driver.list_directory(path).unwrap().collect();
        keys.sort();
        keys
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn empty_groups_is_config_error() {
        let cluster = InMemoryCluster::new(&[1]);
        let mut config = config(&[1]);
        config.groups.clear();
        let node = cluster.node(&config.node_config()).unwrap();
        let err = Driver::connect(&node, config).unwrap_err();
        assert!(matches!(err, DriverError::Config(ConfigError::EmptyGroups)));
    }

    #[test]
    fn no_remotes_is_config_error() {
        let cluster = InMemoryCluster::new(&[1]);
        let mut config = config(&[1]);
        config.nodes.clear();
        let node = cluster.node(&config.node_config()).unwrap();
        let err = Driver::connect(&node, config).unwrap_err();
        assert!(matches!(err, DriverError::Config(ConfigError::EmptyNodes)));
    }

    #[test]
    fn unreachable_remotes_is_connection_error() {
        let cluster = InMemoryCluster::new(&[1]);
        let config = config(&[1]);
        let node = cluster.node(&config.node_config()).unwrap();
        let err = Driver::connect(&node, config).unwrap_err();
        assert!(matches!(err, DriverError::Connection(_)));
    }

    #[test]
    fn one_reachable_remote_is_enough() {
        let mut config = config(&[1]);
        config.nodes.push(RemoteAddr::new("down", 1025));
        let cluster = InMemoryCluster::new(&[1]);
        cluster.listen(REMOTE.parse().unwrap());
        let node = cluster.node(&config.node_config()).unwrap();
        assert!(Driver::connect(&node, config).is_ok());
    }

    #[test]
    fn driver_capabilities() {
        let (_, driver) = fixture();
        assert!(driver.supports_bytes_range());
        assert_eq!(driver.buffer_size(), 128 * 1024);
        assert_eq!(driver.client().required_acks(), 2);
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    #[test]
    fn put_then_get_roundtrips() {
        let (_, driver) = fixture();
        let data = b"{\"id\": \"layer\"}".to_vec();
        assert_eq!(driver.put_content("images/abc/json", &data).unwrap(), "images/abc/json");
        assert_eq!(driver.get_content("images/abc/json").unwrap(), data);
    }

    #[test]
    fn put_is_deterministic() {
        let (cluster, driver) = fixture();
        driver.put_content("a/b/c", b"same").unwrap();
        let count = cluster.object_count(1, "DOCKER");
        driver.put_content("a/b/c", b"same").unwrap();
        assert_eq!(cluster.object_count(1, "DOCKER"), count);
        assert_eq!(driver.get_content("a/b/c").unwrap(), b"same");
        assert_eq!(listing(&driver, "a/b"), vec!["a/b/c".to_string()]);
    }

    #[test]
    fn put_overwrites() {
        let (_, driver) = fixture();
        driver.put_content("a/b", b"a much longer first value").unwrap();
        driver.put_content("a/b", b"short").unwrap();
        assert_eq!(driver.get_content("a/b").unwrap(), b"short");
    }

    #[test]
    fn empty_content_reads_back_as_sentinel() {
        let (_, driver) = fixture();
        driver.put_content("a/empty", b"").unwrap();
        assert_eq!(driver.get_content("a/empty").unwrap(), EMPTY_SENTINEL);
        assert_eq!(driver.get_content("a/empty").unwrap(), b"EMPTY");
        assert_eq!(driver.get_size("a/empty").unwrap(), 5);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_, driver) = fixture();
        let err = driver.get_content("nope/missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn put_root_is_rejected() {
        let (_, driver) = fixture();
        assert!(matches!(driver.put_content("", b"x"), Err(DriverError::InvalidPath(_))));
    }

    #[test]
    fn put_below_quorum_fails() {
        let (cluster, driver) = fixture();
        cluster.set_group_online(1, false);
        cluster.set_group_online(2, false);
        let err = driver.put_content("a/b", b"x").unwrap_err();
        assert!(matches!(err, DriverError::Operation(_)));
    }

    #[test]
    fn put_survives_one_group_down() {
        let (cluster, driver) = fixture();
        cluster.set_group_online(3, false);
        driver.put_content("a/b", b"x").unwrap();
        assert_eq!(driver.get_content("a/b").unwrap(), b"x");
    }

    // -----------------------------------------------------------------------
    // Directory structure
    // -----------------------------------------------------------------------

    #[test]
    fn ancestors_exist_after_put() {
        let (_, driver) = fixture();
        driver.put_content("a/b/c", b"data").unwrap();
        assert!(driver.exists("a/b/c").unwrap());
        assert!(driver.exists("a/b").unwrap());
        assert!(driver.exists("a").unwrap());
        assert!(driver.exists("").unwrap());
        assert!(!driver.exists("a/x").unwrap());
        assert_eq!(listing(&driver, "a"), vec!["a/b".to_string()]);
        assert_eq!(listing(&driver, ""), vec!["a".to_string()]);
    }

    #[test]
    fn listing_mixes_markers_and_leaves() {
        let (_, driver) = fixture();
        driver.put_content("repo/tags/latest", b"1").unwrap();
        driver.put_content("repo/json", b"{}").unwrap();
        assert_eq!(
            listing(&driver, "repo"),
            vec!["repo/json".to_string(), "repo/tags".to_string()]
        );
        let listed = driver.list_directory("repo").unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn listing_missing_directory_is_not_found() {
        let (_, driver) = fixture();
        assert!(driver.list_directory("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn listing_empty_root() {
        let (_, driver) = fixture();
        assert_eq!(driver.list_directory("").unwrap().count(), 0);
    }

    #[test]
    fn directory_named_like_index_namespace_lists_only_its_children() {
        let (_, driver) = fixture();
        driver.put_content("docker/x", b"1").unwrap();
        driver.put_content("images/y/z", b"2").unwrap();
        assert_eq!(listing(&driver, "docker"), vec!["docker/x".to_string()]);
        assert_eq!(
            listing(&driver, ""),
            vec!["docker".to_string(), "images".to_string()]
        );
    }

    #[test]
    fn index_namespace_isolates_listings() {
        let mut other = config(&[1]);
        other.index_namespace = "other".into();
        let (cluster, driver) = fixture_with(config(&[1]));
        driver.put_content("a/b", b"x").unwrap();

        let node = cluster.node(&other.node_config()).unwrap();
        let other_driver = Driver::connect(&node, other).unwrap();
        assert!(!other_driver.exists("a/b").unwrap());
        assert!(driver.exists("a/b").unwrap());
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    #[test]
    fn remove_leaf() {
        let (_, driver) = fixture();
        driver.put_content("a/b/c", b"data").unwrap();
        driver.remove("a/b/c").unwrap();
        assert!(!driver.exists("a/b/c").unwrap());
        assert!(driver.get_content("a/b/c").unwrap_err().is_not_found());
        // Parents stay.
        assert!(driver.exists("a/b").unwrap());
        assert!(listing(&driver, "a/b").is_empty());
    }

    #[test]
    fn remove_missing_is_not_found() {
        let (_, driver) = fixture();
        assert!(driver.remove("never/written").unwrap_err().is_not_found());
    }

    #[test]
    fn remove_cascades_to_all_descendants() {
        let (cluster, driver) = fixture();
        driver.put_content("r/x/1", b"1").unwrap();
        driver.put_content("r/x/y/2", b"2").unwrap();
        driver.put_content("r/z", b"3").unwrap();
        driver.put_content("keep/me", b"4").unwrap();

        driver.remove("r").unwrap();
        for gone in ["r", "r/x", "r/x/1", "r/x/y", "r/x/y/2", "r/z"] {
            assert!(!driver.exists(gone).unwrap(), "{gone} should be gone");
            assert!(cluster.raw_payload(1, "DOCKER", gone).is_none());
        }
        assert_eq!(driver.get_content("keep/me").unwrap(), b"4");
        assert_eq!(listing(&driver, ""), vec!["keep".to_string()]);
    }

    #[test]
    fn remove_tolerates_vanished_children() {
        let (_, driver) = fixture();
        driver.put_content("d/a", b"1").unwrap();
        driver.put_content("d/b", b"2").unwrap();
        // Payload gone but the index still lists it.
        remove_payload_only(&driver, "d/a");
        assert!(driver.get_content("d/a").unwrap_err().is_not_found());
        assert!(driver.exists("d/a").unwrap());

        driver.remove("d").unwrap();
        assert!(!driver.exists("d").unwrap());
        assert!(!driver.exists("d/b").unwrap());
    }

    fn remove_payload_only(driver: &Driver, key: &str) {
        // Drop the payload, then restore the index association the client
        // clears alongside it.
        driver.client().remove(key).unwrap();
        driver
            .client()
            .tag(key, &parent_tag(&driver.config().index_namespace, key))
            .unwrap();
    }

    #[test]
    fn remove_directory_named_like_index_namespace_keeps_siblings() {
        let (_, driver) = fixture();
        driver.put_content("docker/x", b"1").unwrap();
        driver.put_content("images/y/z", b"2").unwrap();

        driver.remove("docker").unwrap();
        assert!(!driver.exists("docker").unwrap());
        assert!(!driver.exists("docker/x").unwrap());
        assert_eq!(driver.get_content("images/y/z").unwrap(), b"2");
        assert_eq!(listing(&driver, ""), vec!["images".to_string()]);
    }

    #[test]
    fn remove_root_is_rejected() {
        let (_, driver) = fixture();
        assert!(matches!(driver.remove(""), Err(DriverError::InvalidPath(_))));
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    #[test]
    fn stream_write_in_three_chunks() {
        let mut config = config(&[1, 2, 3]);
        config.buffer_size = 100;
        let (_, driver) = fixture_with(config);
        let data: Vec<u8> = (0..201u32).map(|i| (i * 7 % 256) as u8).collect();

        let written = driver
            .stream_write("images/big/layer", &mut Cursor::new(data.clone()))
            .unwrap();
        assert_eq!(written, 201);
        assert_eq!(driver.get_content("images/big/layer").unwrap(), data);
        assert_eq!(driver.get_size("images/big/layer").unwrap(), 201);
        assert!(driver.exists("images/big").unwrap());
    }

    #[test]
    fn stream_write_empty_source() {
        let (_, driver) = fixture();
        driver.stream_write("a/empty", &mut std::io::empty()).unwrap();
        assert_eq!(driver.get_content("a/empty").unwrap(), EMPTY_SENTINEL);
    }

    #[test]
    fn stream_read_whole_and_ranged() {
        let (_, driver) = fixture();
        driver.put_content("a/blob", b"0123456789").unwrap();

        let whole: Vec<Vec<u8>> = driver
            .stream_read("a/blob", None)
            .unwrap()
            .collect::<DriverResult<_>>()
            .unwrap();
        assert_eq!(whole, vec![b"0123456789".to_vec()]);

        let range = ByteRange::new(3, 6).unwrap();
        let ranged: Vec<Vec<u8>> = driver
            .stream_read("a/blob", Some(range))
            .unwrap()
            .collect::<DriverResult<_>>()
            .unwrap();
        assert_eq!(ranged, vec![b"3456".to_vec()]);
    }

    #[test]
    fn stream_read_open_ended_range() {
        let (_, driver) = fixture();
        driver.put_content("a/blob", b"0123456789").unwrap();

        for (range, expected) in [
            (ByteRange::new(0, u64::MAX).unwrap(), b"0123456789".to_vec()),
            (ByteRange::new(7, u64::MAX).unwrap(), b"789".to_vec()),
        ] {
            let chunks: Vec<Vec<u8>> = driver
                .stream_read("a/blob", Some(range))
                .unwrap()
                .collect::<DriverResult<_>>()
                .unwrap();
            assert_eq!(chunks, vec![expected]);
        }
    }

    #[test]
    fn stream_read_range_past_end_is_not_found() {
        let (_, driver) = fixture();
        driver.put_content("a/blob", b"0123456789").unwrap();
        let mut stream = driver
            .stream_read("a/blob", Some(ByteRange::new(20, 30).unwrap()))
            .unwrap();
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(err, DriverError::NotFound(ref path) if path == "a/blob"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn stream_read_missing_fails_up_front() {
        let (_, driver) = fixture();
        assert!(driver.stream_read("a/none", None).unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    #[test]
    fn size_matches_content_length() {
        let (_, driver) = fixture();
        for len in [1usize, 9, 1000] {
            let data = vec![b'x'; len];
            driver.put_content("sizes/blob", &data).unwrap();
            assert_eq!(driver.get_size("sizes/blob").unwrap(), len as u64);
        }
    }

    #[test]
    fn size_of_missing_is_not_found() {
        let (_, driver) = fixture();
        assert!(driver.get_size("a/none").unwrap_err().is_not_found());
    }

    #[test]
    fn stat_distinguishes_markers_from_files() {
        let (_, driver) = fixture();
        driver.put_content("a/b/file", b"content").unwrap();
        driver.put_content("a/nine", b"123456789").unwrap();

        let dir = driver.stat("a/b").unwrap();
        assert_eq!(dir.kind, PayloadKind::Directory);
        assert_eq!(dir.size, DIRECTORY_MARKER.len() as u64);
        assert!(driver.is_directory("a").unwrap());

        let file = driver.stat("a/b/file").unwrap();
        assert_eq!(file.kind, PayloadKind::File);
        assert_eq!(file.size, 7);
        assert!(file.modified > Timestamp::zero());

        // Same size as a marker, different content.
        assert!(!driver.is_directory("a/nine").unwrap());
        assert_eq!(driver.stat("").unwrap().kind, PayloadKind::Directory);
        assert!(driver.stat("a/none").unwrap_err().is_not_found());
    }

    #[test]
    fn debug_format() {
        let (_, driver) = fixture();
        let debug = format!("{driver:?}");
        assert!(debug.contains("Driver"));
        assert!(debug.contains("QuorumClient"));
    }
}
