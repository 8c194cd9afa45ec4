//! # Stream Writer
//!
//! Orchestrates a single output stream's lifecycle: write the schema message
//! once, write zero or more record-batch messages, write the end-of-stream
//! marker, tracking cumulative bytes and the row-group count along the way.
//!
//! One writer owns one stream. The row-group counter, byte counter, and the
//! internal encoder queue are mutated in place under exclusive access from a
//! single calling thread; independent writers over distinct destinations may
//! run concurrently with no shared state.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::compression::Compression;
use crate::enums::WriterState;
use crate::error::IoError;
use crate::models::encoders::batch::BatchEncoder;
use crate::models::encoders::protocol::{WireFrame, WireFrameEncoder};
use crate::models::streams::disk::DiskByteSink;
use crate::models::types::column::Batch;
use crate::models::types::schema::Schema;
use crate::traits::byte_stream::ByteSink;
use crate::traits::frame_encoder::FrameEncoder;

/// Writer for one framed stream over an arbitrary [`ByteSink`].
#[derive(Debug)]
pub struct StreamWriter<W: ByteSink> {
    sink: W,
    schema: Arc<Schema>,
    codec: Compression,
    encoder: BatchEncoder,
    state: WriterState,
    row_groups: u64,
}

impl StreamWriter<DiskByteSink> {
    /// Create a writer over a fresh destination file.
    ///
    /// The schema is validated *before* the destination is touched, so a
    /// zero-column schema never leaves an empty file behind; the destination
    /// itself is opened create-exclusive and fails if it already exists.
    pub fn create(
        path: impl AsRef<Path>,
        schema: Schema,
        codec: Compression,
    ) -> Result<Self, IoError> {
        if schema.fields.is_empty() {
            return Err(IoError::EmptySchema);
        }
        let sink = DiskByteSink::create_new(path)?;
        Self::new(sink, schema, codec)
    }
}

impl<W: ByteSink> StreamWriter<W> {
    /// Bind a writer to an already-opened sink.
    pub fn new(sink: W, schema: Schema, codec: Compression) -> Result<Self, IoError> {
        if schema.fields.is_empty() {
            return Err(IoError::EmptySchema);
        }
        let schema = Arc::new(schema);
        let encoder = BatchEncoder::new(Arc::clone(&schema), codec);
        Ok(Self {
            sink,
            schema,
            codec,
            encoder,
            state: WriterState::Fresh,
            row_groups: 0,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Emit the schema message. Must be the first message of the stream and
    /// is written at most once.
    ///
    /// # Errors
    /// [`IoError::Lifecycle`] if the schema was already written or the
    /// writer is finished.
    pub fn write_schema(&mut self) -> Result<(), IoError> {
        match self.state {
            WriterState::Fresh => {}
            WriterState::SchemaDone => {
                return Err(IoError::Lifecycle(
                    "schema message already written".to_string(),
                ))
            }
            WriterState::Closed => {
                return Err(IoError::Lifecycle("writer already finished".to_string()))
            }
        }
        self.encoder.encode_schema()?;
        self.encoder.flush(&mut self.sink)?;
        self.state = WriterState::SchemaDone;
        debug!("schema message written ({} fields)", self.schema.n_fields());
        Ok(())
    }

    /// Serialise and write one row group, then clear the caller's batch.
    ///
    /// Writes the schema message first if it has not been written yet. An
    /// empty batch is still serialised, producing a valid zero-row message,
    /// and still counts as a row group. On success the input batch has been
    /// fully externalised and is reset for reuse.
    pub fn write_batch(&mut self, batch: &mut Batch) -> Result<(), IoError> {
        if self.state == WriterState::Closed {
            return Err(IoError::Lifecycle("writer already finished".to_string()));
        }
        if self.state == WriterState::Fresh {
            self.write_schema()?;
        }
        self.encoder.encode_batch(batch)?;
        batch.clear();
        self.encoder.flush(&mut self.sink)?;
        self.row_groups += 1;
        debug!(
            "row group {} flushed ({} bytes so far)",
            self.row_groups,
            self.sink.bytes_written()
        );
        Ok(())
    }

    /// Produce an independent encoder pre-bound to this writer's schema.
    ///
    /// Enables off-band pre-serialisation of a batch before handing it to
    /// [`write_encoded`](Self::write_encoded), for pipelines where encoding
    /// and the I/O flush run on different stages.
    pub fn new_encoder(&self) -> BatchEncoder {
        BatchEncoder::new(Arc::clone(&self.schema), self.codec)
    }

    /// Flush a pre-filled encoder through this writer, counting one row
    /// group.
    pub fn write_encoded(&mut self, encoder: &mut BatchEncoder) -> Result<(), IoError> {
        if self.state == WriterState::Closed {
            return Err(IoError::Lifecycle("writer already finished".to_string()));
        }
        if self.state == WriterState::Fresh {
            self.write_schema()?;
        }
        encoder.flush(&mut self.sink)?;
        self.row_groups += 1;
        Ok(())
    }

    /// Write the end-of-stream marker and close the destination.
    ///
    /// Must be called exactly once, after all row groups are written; no
    /// further writes are permitted afterwards.
    pub fn finish(&mut self) -> Result<(), IoError> {
        if self.state == WriterState::Closed {
            return Err(IoError::Lifecycle("writer already finished".to_string()));
        }
        if self.state == WriterState::Fresh {
            self.write_schema()?;
        }
        let frame = WireFrame {
            meta: &[],
            body: &[],
            is_last: true,
        };
        let (eos, _) = WireFrameEncoder::encode::<Vec<u8>>(&frame)?;
        self.sink.write_all(&eos)?;
        self.sink.close()?;
        self.state = WriterState::Closed;
        debug!(
            "stream finished: {} row groups, {} bytes",
            self.row_groups,
            self.sink.bytes_written()
        );
        Ok(())
    }

    /// Row groups written so far. Plain accessor; this writer is
    /// single-owner, single-thread per stream.
    pub fn num_row_groups(&self) -> u64 {
        self.row_groups
    }

    /// Bytes written to the destination so far, end-of-stream marker
    /// included once [`finish`](Self::finish) has run.
    pub fn file_size(&self) -> u64 {
        self.sink.bytes_written()
    }
}
