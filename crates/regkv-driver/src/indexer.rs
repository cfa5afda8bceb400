//! Synthetic directory structure.
//!
//! Every entry is indexed under `(namespace, dirname(path))`, and every
//! ancestor of a written path holds a directory marker indexed under its own
//! parent. For `a/b/c` that is:
//!
//! | key     | payload     | tag               |
//! |---------|-------------|-------------------|
//! | `a/b/c` | content     | `(ns, "a/b")`     |
//! | `a/b`   | `DIRECTORY` | `(ns, "a")`       |
//! | `a`     | `DIRECTORY` | `(ns, "")`        |
//!
//! Listing `p` is then a lookup of tag `(ns, p)`, and existence of `p` is
//! membership in the listing of its parent.

use tracing::debug;

use regkv_store::QuorumClient;
use regkv_types::{ancestors, parent_tag, stored_body, validate_leaf, DIRECTORY_MARKER};

use crate::error::{DriverError, DriverResult};

/// Writes entries and maintains the directory markers above them.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryIndexer<'a> {
    client: &'a QuorumClient,
    namespace: &'a str,
}

impl<'a> DirectoryIndexer<'a> {
    pub fn new(client: &'a QuorumClient, namespace: &'a str) -> Self {
        Self { client, namespace }
    }

    /// Write `content` at `path`, index it under its parent and create every
    /// ancestor marker. Empty content is stored as the empty sentinel.
    pub fn put_entry(&self, path: &str, content: &[u8]) -> DriverResult<()> {
        validate_leaf(path).map_err(|_| DriverError::InvalidPath(path.to_string()))?;
        let body = stored_body(content);
        let tag = parent_tag(self.namespace, path);
        debug!(path, len = body.len(), %tag, "writing entry");
        self.client.write(path, body)?;
        self.client.tag(path, &tag)?;
        self.ensure_ancestors(path)?;
        Ok(())
    }

    /// Write a directory marker at every ancestor of `path`, nearest first,
    /// stopping before the root. Returns the number of markers written.
    ///
    /// Rewriting an existing marker is harmless, so this is idempotent.
    pub fn ensure_ancestors(&self, path: &str) -> DriverResult<usize> {
        debug!(path, "creating directory structure");
        let mut written = 0;
        for dir in ancestors(path) {
            let tag = parent_tag(self.namespace, dir);
            debug!(dir, %tag, "creating directory marker");
            self.client.write(dir, DIRECTORY_MARKER)?;
            self.client.tag(dir, &tag)?;
            written += 1;
        }
        debug!(path, markers = written, "directory structure created");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regkv_config::{DriverConfig, RemoteAddr};
    use regkv_store::{InMemoryCluster, SessionParams};
    use regkv_types::{Tag, EMPTY_SENTINEL};
    use std::sync::Arc;

    fn client(cluster: &InMemoryCluster) -> QuorumClient {
        let config = DriverConfig::with_nodes(vec![RemoteAddr::new("h", 1)]);
        let params = SessionParams::new(config.groups.clone(), config.namespace.clone());
        let session = regkv_store::InMemorySession::new(cluster.clone(), params.clone());
        QuorumClient::from_session(Arc::new(session), params)
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn markers_for_every_ancestor() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");

        assert_eq!(indexer.ensure_ancestors("a/b/c").unwrap(), 2);
        assert_eq!(client.read("a/b", 0, 0).unwrap(), DIRECTORY_MARKER);
        assert_eq!(client.read("a", 0, 0).unwrap(), DIRECTORY_MARKER);
        assert_eq!(
            client.find_by_tag(&Tag::new("docker", "a")).unwrap(),
            vec!["a/b".to_string()]
        );
        assert_eq!(
            client.find_by_tag(&Tag::new("docker", "")).unwrap(),
            vec!["a".to_string()]
        );
        // The leaf itself is not written.
        assert!(client.read("a/b/c", 0, 0).is_err());
    }

    #[test]
    fn top_level_entry_has_no_markers() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        assert_eq!(indexer.ensure_ancestors("layer").unwrap(), 0);
        assert_eq!(cluster.object_count(1, "DOCKER"), 0);
    }

    #[test]
    fn ensure_ancestors_is_idempotent() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        indexer.ensure_ancestors("a/b/c/d").unwrap();
        let count = cluster.object_count(1, "DOCKER");
        indexer.ensure_ancestors("a/b/c/d").unwrap();
        assert_eq!(cluster.object_count(1, "DOCKER"), count);
        assert_eq!(count, 3);
    }

    #[test]
    fn deep_paths() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        let path: Vec<String> = (0..40).map(|i| format!("d{i}")).collect();
        assert_eq!(indexer.ensure_ancestors(&path.join("/")).unwrap(), 39);
    }

    #[test]
    fn put_entry_tags_leaf_and_ancestors() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        indexer.put_entry("a/b/c", b"data").unwrap();
        indexer.put_entry("a/b/d", b"more").unwrap();

        assert_eq!(client.read("a/b/c", 0, 0).unwrap(), b"data");
        assert_eq!(
            sorted(client.find_by_tag(&Tag::new("docker", "a/b")).unwrap()),
            vec!["a/b/c".to_string(), "a/b/d".to_string()]
        );
    }

    #[test]
    fn put_entry_stores_sentinel_for_empty_content() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        indexer.put_entry("a/empty", b"").unwrap();
        assert_eq!(client.read("a/empty", 0, 0).unwrap(), EMPTY_SENTINEL);
    }

    #[test]
    fn put_entry_rejects_root() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        assert!(matches!(
            indexer.put_entry("", b"x"),
            Err(DriverError::InvalidPath(_))
        ));
    }

    #[test]
    fn index_failure_stops_marker_creation() {
        let cluster = InMemoryCluster::new(&[1]);
        let client = client(&cluster);
        let indexer = DirectoryIndexer::new(&client, "docker");
        cluster.fail_index_updates(true);
        let err = indexer.ensure_ancestors("a/b/c").unwrap_err();
        assert!(matches!(err, DriverError::Operation(_)));
    }
}
