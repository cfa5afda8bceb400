//! Foundation types for regkv.
//!
//! regkv presents a hierarchical, path-addressed object API on top of a flat
//! replicated key-value store that only knows keys and tag indexes. This crate
//! holds the pure pieces every other regkv crate shares: how a path becomes a
//! store key and an index tag, the payload sentinels, byte ranges and the
//! store's timestamp representation.
//!
//! # Key Types
//!
//! - [`Tag`] — secondary-index label `(namespace, parent-path)`
//! - [`ByteRange`] — inclusive `[start, end]` range for ranged reads
//! - [`Timestamp`] — seconds/nanoseconds pair reported by store lookups
//!
//! # Path mapping
//!
//! The functions in [`path`] derive keys and tags from paths. They perform no
//! I/O and are deterministic.

pub mod error;
pub mod path;
pub mod payload;
pub mod range;
pub mod temporal;

pub use error::TypeError;
pub use path::{ancestors, dirname, is_root, key, parent_tag, validate_leaf, Ancestors, Tag, ROOT};
pub use payload::{classify, may_be_directory, stored_body, PayloadKind, DIRECTORY_MARKER, EMPTY_SENTINEL};
pub use range::ByteRange;
pub use temporal::Timestamp;
