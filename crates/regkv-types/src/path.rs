//! Path to key and tag derivation.
//!
//! A path is a slash-delimited identifier used verbatim as the store key. The
//! empty string is the root. Every entry is indexed under a [`Tag`] naming its
//! parent, which is how listing works on a store without directories.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The root path.
pub const ROOT: &str = "";

/// Path separator.
pub const SEPARATOR: char = '/';

/// Secondary-index label shared by every entry under the same parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    /// Logical partition for the index, shared by all tags of one driver.
    pub namespace: String,
    /// Parent path the tagged entries live under.
    pub parent: String,
}

impl Tag {
    pub fn new(namespace: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            parent: parent.into(),
        }
    }

    /// Single store index name for this tag.
    ///
    /// The namespace is length-prefixed, so two tags share an index name only
    /// when both of their parts are equal.
    ///
    /// ```
    /// use regkv_types::Tag;
    ///
    /// assert_eq!(Tag::new("docker", "a/b").index_name(), "6:docker:a/b");
    /// assert_ne!(
    ///     Tag::new("docker", "docker").index_name(),
    ///     Tag::new("docker", "").index_name(),
    /// );
    /// ```
    pub fn index_name(&self) -> String {
        format!("{}:{}:{}", self.namespace.len(), self.namespace, self.parent)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.namespace, self.parent)
    }
}

/// Returns `true` for the root path.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Store key for a path. Paths are used verbatim.
pub fn key(path: &str) -> &str {
    path
}

/// Parent of `path`: everything before the last separator, or the root when
/// there is no separator.
///
/// The result is always strictly shorter than a non-root input, so repeated
/// application reaches the root.
pub fn dirname(path: &str) -> &str {
    match path.rsplit_once(SEPARATOR) {
        Some((head, _)) => head,
        None => ROOT,
    }
}

/// Tag under which `path` is indexed.
pub fn parent_tag(namespace: &str, path: &str) -> Tag {
    Tag::new(namespace, dirname(path))
}

/// Reject the root as a leaf target.
pub fn validate_leaf(path: &str) -> Result<(), TypeError> {
    if is_root(path) {
        return Err(TypeError::RootPath(path.to_string()));
    }
    Ok(())
}

/// Iterate over the ancestors of `path`, nearest first, stopping before the
/// root.
///
/// ```
/// use regkv_types::ancestors;
///
/// let all: Vec<&str> = ancestors("a/b/c").collect();
/// assert_eq!(all, vec!["a/b", "a"]);
/// ```
pub fn ancestors(path: &str) -> Ancestors<'_> {
    Ancestors {
        next: dirname(path),
    }
}

/// Iterator returned by [`ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    next: &'a str,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if is_root(self.next) {
            return None;
        }
        let current = self.next;
        self.next = dirname(current);
        Some(current)
    }
}
