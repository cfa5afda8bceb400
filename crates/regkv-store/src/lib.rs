//! Backing store boundary for regkv.
//!
//! The backing store is a flat, replicated key-value store: whole-object
//! writes (with an append mode), ranged reads, removal, tag indexes and
//! metadata lookup. Everything it returns carries a native error code. This
//! crate is the only place those codes are seen: [`QuorumClient`] applies the
//! quorum policy to per-group replies and translates failures into
//! [`StoreError`].
//!
//! # Modules
//!
//! - [`error`] — [`NativeError`] codes and the [`StoreError`] taxonomy
//! - [`session`] — the [`StoreNode`] and [`StoreSession`] traits consumed here
//! - [`quorum`] — majority acceptance of per-group replies
//! - [`client`] — [`QuorumClient`]
//! - [`memory`] — [`InMemoryCluster`], a replicated backend for tests and embedding
//! - [`log`] — [`NodeLog`], the node's own log stream
//!
//! # Rules
//!
//! 1. An operation is durable once `groups / 2 + 1` groups acknowledge it.
//!    Fewer acknowledgements is a failure, never a degraded success.
//! 2. Session parameters (groups, namespace, quorum) are bound once, when the
//!    client is constructed.
//! 3. Every call is a single blocking round trip. The client keeps no state
//!    beyond its bound parameters and is safe to share across threads.

pub mod client;
pub mod error;
pub mod log;
pub mod memory;
pub mod quorum;
pub mod session;

pub use client::{Metadata, QuorumClient};
pub use error::{NativeError, NativeResult, StoreError, StoreResult};
pub use log::NodeLog;
pub use memory::{InMemoryCluster, InMemoryNode, InMemorySession, MAX_OBJECT_SIZE};
pub use quorum::quorum;
pub use session::{
    GroupId, GroupReply, IndexEntry, IndexMatch, LookupInfo, SessionParams, StoreNode,
    StoreSession, WriteMode,
};
