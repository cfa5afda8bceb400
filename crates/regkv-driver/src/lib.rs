//! Hierarchical storage driver over a flat replicated key-value store.
//!
//! A container registry addresses its blobs by slash-delimited paths and
//! expects to list and test directories. The backing store has keys and tag
//! indexes only. [`Driver`] bridges the two:
//!
//! - every entry is stored under its path and indexed under its parent, so
//!   listing a directory is a tag lookup;
//! - every ancestor of a written path gets a synthetic directory marker, so
//!   directories exist without native support;
//! - uploads are streamed in chunks, the first written whole and the rest
//!   appended;
//! - removal cascades through index children before removing the target.
//!
//! All store traffic goes through a quorum-checked
//! [`QuorumClient`](regkv_store::QuorumClient).
//!
//! Concurrent writers of the same path are not coordinated: the last write to
//! reach the store wins.

pub mod driver;
pub mod error;
pub mod indexer;
pub mod stream;

pub use driver::{DirectoryListing, Driver, EntryAttributes};
pub use error::{DriverError, DriverResult};
pub use indexer::DirectoryIndexer;
pub use stream::{ChunkStream, StreamWriter};
