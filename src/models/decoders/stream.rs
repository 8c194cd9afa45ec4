//! # Stream Decoder
//!
//! Blocking cursor over a framed byte stream: yields the schema message
//! first, then record batches, until the end-of-stream marker.
//!
//! Wraps a [`ByteSource`] with a [`WireFrameDecoder`] and manages batch
//! state and the decompressor registry. The decode/parse step advancing the
//! cursor is serial; consumers may fan out the *returned* batches however
//! they like.
//!
//! Termination semantics: the EOS marker is a normal, non-error signal. The
//! source is released when it is seen (or on [`close`](StreamDecoder::close))
//! and every subsequent call behaves as end-of-iteration. An underlying EOF
//! *before* the marker is a malformed stream, not a normal end.

use log::{debug, trace};

use crate::compression::DecompressorRegistry;
use crate::enums::{BatchState, BufferChunkSize, DecodeResult, MessageKind};
use crate::error::IoError;
use crate::models::decoders::batch::{decode_batch, parse_batch_meta};
use crate::models::decoders::protocol::WireFrameDecoder;
use crate::models::decoders::schema::{parse_schema_meta, read_message_kind};
use crate::models::frames::wire_message::WireMessage;
use crate::models::types::column::Batch;
use crate::models::types::schema::Schema;
use crate::traits::byte_stream::ByteSource;
use crate::traits::frame_decoder::FrameDecoder;

/// Blocking reader yielding a schema, then [`Batch`]es, from a framed
/// byte stream.
pub struct StreamDecoder<S: ByteSource> {
    /// Source handle; `None` once released (EOS seen or closed early).
    source: Option<S>,
    decoder: WireFrameDecoder<Vec<u8>>,
    registry: DecompressorRegistry,
    /// Bytes received but not yet consumed as frames.
    buf: Vec<u8>,
    /// Reusable staging buffer for source reads.
    staging: Vec<u8>,
    chunk_size: usize,
    state: BatchState,
    schema: Option<Schema>,
}

impl<S: ByteSource> StreamDecoder<S> {
    /// Create a decoder over `source` with the given decompressor registry.
    ///
    /// The registry is the decoder's entire decompression configuration;
    /// nothing is looked up from ambient state.
    pub fn new(source: S, registry: DecompressorRegistry) -> Self {
        Self::with_chunk_size(source, registry, BufferChunkSize::FileIO)
    }

    pub fn with_chunk_size(
        source: S,
        registry: DecompressorRegistry,
        chunk: BufferChunkSize,
    ) -> Self {
        Self {
            source: Some(source),
            decoder: WireFrameDecoder::new(),
            registry,
            buf: Vec::new(),
            staging: Vec::new(),
            chunk_size: chunk.chunk_size(),
            state: BatchState::NeedSchema,
            schema: None,
        }
    }

    /// Parse the schema message, reading it from the stream if it has not
    /// been seen yet.
    ///
    /// Any failure before a valid schema message is obtained is fatal for
    /// the stream: a record batch or EOS in first position, or an EOF, is
    /// [`IoError::MalformedStream`].
    pub fn read_schema(&mut self) -> Result<&Schema, IoError> {
        match self.schema {
            Some(ref schema) => Ok(schema),
            None => {
                let frame = self.next_frame()?.ok_or_else(|| {
                    IoError::MalformedStream("stream ended before a schema message".to_string())
                })?;
                if frame.is_eos() {
                    return Err(IoError::MalformedStream(
                        "end-of-stream marker before a schema message".to_string(),
                    ));
                }
                let schema = parse_schema_meta(&frame.message)?;
                debug!(
                    "decoded schema: {} fields, {} metadata pairs",
                    schema.n_fields(),
                    schema.metadata.len()
                );
                self.state = BatchState::Ready;
                Ok(self.schema.insert(schema))
            }
        }
    }

    /// Decoded schema, if the schema message has been read.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Yield the next record batch, or `None` at end of stream.
    ///
    /// Reads the schema message first when necessary. After the EOS marker
    /// (or [`close`](Self::close)) every call returns `Ok(None)`.
    pub fn next_batch(&mut self) -> Result<Option<Batch>, IoError> {
        if matches!(self.state, BatchState::Done) {
            return Ok(None);
        }
        if matches!(self.state, BatchState::NeedSchema) {
            self.read_schema()?;
        }

        let frame = match self.next_frame()? {
            Some(frame) => frame,
            None => {
                return Err(IoError::MalformedStream(
                    "stream ended before the end-of-stream marker".to_string(),
                ))
            }
        };

        if frame.is_eos() {
            debug!("end-of-stream marker observed");
            self.finish_iteration();
            return Ok(None);
        }

        match read_message_kind(&frame.message)? {
            MessageKind::RecordBatch => {}
            MessageKind::Schema => {
                return Err(IoError::MalformedStream(
                    "second schema message in stream".to_string(),
                ));
            }
        }

        let header = parse_batch_meta(&frame.message)?;
        let schema = match &self.schema {
            Some(schema) => schema,
            None => {
                return Err(IoError::Lifecycle(
                    "record batch decoded before the schema message".to_string(),
                ))
            }
        };
        let batch = decode_batch(&header, &frame.body, schema, &self.registry)?;
        trace!("decoded record batch: {} rows", batch.n_rows);
        Ok(Some(batch))
    }

    /// Stop reading and release the underlying source.
    ///
    /// Subsequent [`next_batch`](Self::next_batch) calls return `Ok(None)`,
    /// mirroring a normal end-of-iteration rather than an error.
    pub fn close(&mut self) -> Result<(), IoError> {
        self.finish_iteration();
        Ok(())
    }

    fn finish_iteration(&mut self) {
        self.state = BatchState::Done;
        if let Some(mut source) = self.source.take() {
            // Release failures at end-of-iteration have nowhere useful to go.
            let _ = source.close();
        }
        self.buf.clear();
    }

    /// Pull the next complete frame, reading more chunks as needed.
    ///
    /// Returns `None` on a clean underlying EOF with no partial frame
    /// pending; callers decide whether that EOF was legitimate.
    fn next_frame(&mut self) -> Result<Option<WireMessage<Vec<u8>>>, IoError> {
        loop {
            match self.decoder.decode(&self.buf)? {
                DecodeResult::Frame { frame, consumed } => {
                    self.buf.drain(0..consumed);
                    return Ok(Some(frame));
                }
                DecodeResult::NeedMore => {}
            }

            let source = match self.source.as_mut() {
                Some(source) => source,
                None => return Ok(None),
            };
            if self.staging.len() != self.chunk_size {
                self.staging.resize(self.chunk_size, 0);
            }
            let n = source.read(&mut self.staging)?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(IoError::MalformedStream(format!(
                    "stream truncated mid-frame with {} bytes pending",
                    self.buf.len()
                )));
            }
            self.buf.extend_from_slice(&self.staging[..n]);
        }
    }
}
