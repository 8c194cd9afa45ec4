//! # Stream Reader
//!
//! Path-opening convenience over [`StreamDecoder`] + [`DiskByteSource`]:
//! opens the file, reads the schema, and iterates record batches. The
//! framing, decompression, and termination semantics are all the
//! decoder's; this type only wires the disk source in.

use std::path::Path;

use crate::compression::DecompressorRegistry;
use crate::enums::BufferChunkSize;
use crate::error::IoError;
use crate::models::decoders::stream::StreamDecoder;
use crate::models::streams::disk::DiskByteSource;
use crate::models::types::column::Batch;
use crate::models::types::schema::Schema;

/// Blocking file reader yielding a schema, then [`Batch`]es.
pub struct StreamReader {
    inner: StreamDecoder<DiskByteSource>,
}

impl StreamReader {
    /// Open `path` and prepare to decode it with the given registry.
    pub fn open(
        path: impl AsRef<Path>,
        registry: DecompressorRegistry,
    ) -> Result<Self, IoError> {
        let source = DiskByteSource::open(path, BufferChunkSize::FileIO)?;
        Ok(Self {
            inner: StreamDecoder::new(source, registry),
        })
    }

    /// Parse the schema message, reading it from the file if needed.
    pub fn read_schema(&mut self) -> Result<&Schema, IoError> {
        self.inner.read_schema()
    }

    /// Decoded schema, if the schema message has been read.
    pub fn schema(&self) -> Option<&Schema> {
        self.inner.schema()
    }

    /// Yield the next record batch, or `None` at end of stream.
    pub fn next_batch(&mut self) -> Result<Option<Batch>, IoError> {
        self.inner.next_batch()
    }

    /// Stop reading and release the file handle; subsequent calls behave as
    /// end-of-iteration.
    pub fn close(&mut self) -> Result<(), IoError> {
        self.inner.close()
    }

    /// Drain every remaining batch into a vector. Convenience for callers
    /// that want the whole stream at once.
    pub fn read_all(&mut self) -> Result<Vec<Batch>, IoError> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch()? {
            batches.push(batch);
        }
        Ok(batches)
    }
}
