//! Chunked upload and ranged download.
//!
//! The store writes whole objects, with an append mode. An upload is framed
//! as one full write of the first chunk (which also indexes the path and
//! creates its ancestors) followed by one append per further chunk.

use std::io::{ErrorKind, Read};

use tracing::{debug, error};

use regkv_store::QuorumClient;
use regkv_types::ByteRange;

use crate::error::{DriverError, DriverResult};
use crate::indexer::DirectoryIndexer;

/// Streams a reader into the store in fixed-size chunks.
#[derive(Debug)]
pub struct StreamWriter<'a> {
    client: &'a QuorumClient,
    indexer: DirectoryIndexer<'a>,
    buffer_size: usize,
}

impl<'a> StreamWriter<'a> {
    pub fn new(client: &'a QuorumClient, namespace: &'a str, buffer_size: usize) -> Self {
        Self {
            client,
            indexer: DirectoryIndexer::new(client, namespace),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Upload everything `source` yields to `path` and return the number of
    /// source bytes stored.
    ///
    /// A source that yields nothing stores the empty sentinel. A read error
    /// stops the upload after the last complete chunk and is returned as
    /// [`DriverError::SourceRead`]; the partial object stays in place until
    /// the next upload to the same path overwrites it.
    pub fn write(&self, path: &str, source: &mut dyn Read) -> DriverResult<u64> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut written: u64 = 0;
        let mut chunks = 0usize;

        loop {
            let n = match fill_chunk(source, &mut buf) {
                Ok(n) => n,
                Err(err) => {
                    error!(path, written, error = %err, "unable to read from upload source");
                    return Err(DriverError::SourceRead {
                        path: path.to_string(),
                        written,
                        source: err,
                    });
                }
            };
            if n == 0 {
                break;
            }

            if chunks == 0 {
                // Replaces any previous object and sets up every tag.
                self.indexer.put_entry(path, &buf[..n])?;
            } else {
                self.client.append(path, &buf[..n])?;
            }
            chunks += 1;
            written += n as u64;
        }

        if chunks == 0 {
            self.indexer.put_entry(path, &[])?;
        }
        debug!(path, written, chunks, "stream write complete");
        Ok(written)
    }
}

/// Read until `buf` is full or the source is exhausted.
fn fill_chunk(source: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Lazy, finite, single-pass sequence of content chunks.
///
/// Yields exactly one chunk: the whole object, or the requested range. The
/// read happens on the first call to `next`.
#[derive(Debug)]
pub struct ChunkStream<'a> {
    client: &'a QuorumClient,
    path: String,
    range: Option<ByteRange>,
    done: bool,
}

impl<'a> ChunkStream<'a> {
    pub(crate) fn new(client: &'a QuorumClient, path: &str, range: Option<ByteRange>) -> Self {
        Self {
            client,
            path: path.to_string(),
            range,
            done: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn range(&self) -> Option<ByteRange> {
        self.range
    }
}

impl Iterator for ChunkStream<'_> {
    type Item = DriverResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.done = true;

        let (offset, size) = match self.range {
            Some(range) => (range.offset(), range.len()),
            None => (0, 0),
        };
        debug!(path = %self.path, offset, size, "stream read");
        Some(
            self.client
                .read(&self.path, offset, size)
                .map_err(|_| DriverError::NotFound(self.path.clone())),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::from(!self.done);
        (left, Some(left))
    }
}
