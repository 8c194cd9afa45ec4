//! # Batch Encoder
//!
//! Serialises columnar [`Batch`] values into framed record-batch messages.
//!
//! The encoder is bound to an immutable schema at construction and keeps a
//! queue of encoded frames; [`flush`](GBatchEncoder::flush) is the only
//! operation that performs I/O. This split lets a pipeline pre-serialise
//! batches off-band (e.g. on a different stage) and hand the encoder to the
//! stream writer for the actual write.
//!
//! For each field, in schema order, the encoder emits the physical buffers
//! the field's type requires: a validity bitmap (only when the field is
//! nullable and the column carries a mask), offsets for variable-length
//! types, data, and child buffers recursively for nested types — every
//! buffer zero-padded to the alignment boundary, every buffer independently
//! compressed when a codec is configured and compression actually shrinks
//! it. Field nodes and buffers are recorded in preorder: a parent's node and
//! buffers precede its children's.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use log::trace;

use crate::compression::{compress, Compression};
use crate::constants::DEFAULT_FRAME_ALLOCATION_SIZE;
use crate::enums::MessageKind;
use crate::error::IoError;
use crate::models::encoders::protocol::{WireFrame, WireFrameEncoder};
use crate::models::encoders::schema::encode_schema_meta;
use crate::models::frames::wire_message::{BufferDescriptor, FieldNode};
use crate::models::types::column::{Batch, Bitmask, Column, ColumnData};
use crate::models::types::schema::{Field, Schema, WireType};
use crate::traits::byte_stream::ByteSink;
use crate::traits::frame_encoder::FrameEncoder;
use crate::traits::stream_buffer::StreamBuffer;
use crate::utils::{align_to, as_bytes};

/// Batch encoder producing frames in a standard `Vec<u8>` buffer.
///
/// See [`GBatchEncoder`] for further details.
pub type BatchEncoder = GBatchEncoder<Vec<u8>>;

/// Schema-bound encoder turning [`Batch`]es into framed wire messages.
///
/// Construction binds the encoder to its schema for the remaining lifetime
/// of the stream; the binding happens exactly once, by ownership. Encoded
/// messages queue in `out_frames` and are fully self-consistent (declared
/// lengths match encoded bytes) before any flush.
#[derive(Debug)]
pub struct GBatchEncoder<B>
where
    B: StreamBuffer + 'static,
{
    /// Wire schema for this stream (column definitions), shared with the
    /// owning writer.
    schema: Arc<Schema>,

    /// Codec applied per-buffer to record-batch bodies.
    codec: Compression,

    /// Queue of encoded frames pending flush.
    out_frames: VecDeque<B>,
}

impl<B> GBatchEncoder<B>
where
    B: StreamBuffer,
{
    /// Bind a new encoder to `schema`. The schema is immutable for the
    /// encoder's lifetime.
    pub fn new(schema: Arc<Schema>, codec: Compression) -> Self {
        Self {
            schema,
            codec,
            out_frames: VecDeque::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of encoded frames awaiting flush.
    pub fn pending_frames(&self) -> usize {
        self.out_frames.len()
    }

    /// Encode the schema message only and queue its frame.
    pub fn encode_schema(&mut self) -> Result<(), IoError> {
        let meta = encode_schema_meta(&self.schema);
        let frame = WireFrame {
            meta: &meta,
            body: &[],
            is_last: false,
        };
        let (encoded, _) = WireFrameEncoder::encode::<B>(&frame)?;
        self.out_frames.push_back(encoded);
        Ok(())
    }

    /// Encode one columnar batch as a record-batch message and queue its
    /// frame.
    ///
    /// Buffer byte lengths are computed from the batch's actual population,
    /// not the schema's static shape. A zero-row batch encodes to a valid,
    /// separately decodable zero-row message.
    ///
    /// # Errors
    /// [`IoError::InputDataError`] if the batch's shape or types are
    /// inconsistent with the bound schema.
    pub fn encode_batch(&mut self, batch: &Batch) -> Result<(), IoError> {
        if batch.columns.len() != self.schema.fields.len() {
            return Err(IoError::InputDataError(format!(
                "batch has {} columns but schema has {}",
                batch.columns.len(),
                self.schema.fields.len()
            )));
        }

        let mut nodes: Vec<FieldNode> = Vec::with_capacity(batch.columns.len());
        let mut buffers: Vec<BufferDescriptor> = Vec::new();
        let mut body = B::with_capacity(DEFAULT_FRAME_ALLOCATION_SIZE);

        let fields = Arc::clone(&self.schema);
        for (field, column) in fields.fields.iter().zip(&batch.columns) {
            self.encode_column(field, column, batch.n_rows, &mut nodes, &mut buffers, &mut body)?;
        }

        let meta = encode_batch_meta(batch.n_rows, self.codec, &nodes, &buffers, body.len());
        let frame = WireFrame {
            meta: &meta,
            body: body.as_ref(),
            is_last: false,
        };
        let (encoded, frame_meta) = WireFrameEncoder::encode::<B>(&frame)?;
        debug_assert_eq!(encoded.len(), frame_meta.frame_len());
        trace!(
            "encoded record batch: {} rows, {} buffers, {} body bytes",
            batch.n_rows,
            buffers.len(),
            body.len()
        );
        self.out_frames.push_back(encoded);
        Ok(())
    }

    /// Write all queued frames to `sink` and clear the queue.
    ///
    /// This is the only operation on the encoder that performs I/O. Returns
    /// the number of bytes written.
    pub fn flush<W: ByteSink>(&mut self, sink: &mut W) -> Result<u64, IoError> {
        let mut written = 0u64;
        while let Some(frame) = self.out_frames.pop_front() {
            sink.write_all(frame.as_ref())?;
            written += frame.len() as u64;
        }
        Ok(written)
    }

    /// Encode a single column into body buffers and message descriptors.
    ///
    /// Dispatches on the field's type, validates the column payload against
    /// it, and recurses into children for nested types. Appends exactly one
    /// field node per (sub)field and the buffers listed in the wire layout
    /// table, in preorder.
    fn encode_column(
        &self,
        field: &Field,
        column: &Column,
        expected_rows: usize,
        nodes: &mut Vec<FieldNode>,
        buffers: &mut Vec<BufferDescriptor>,
        body: &mut B,
    ) -> Result<(), IoError> {
        let n = column.value_count();
        if n != expected_rows {
            return Err(IoError::InputDataError(format!(
                "column '{}' has {} values, expected {}",
                field.name, n, expected_rows
            )));
        }
        if let Some(mask) = &column.validity {
            if mask.len != n {
                return Err(IoError::InputDataError(format!(
                    "column '{}' validity covers {} rows, expected {}",
                    field.name, mask.len, n
                )));
            }
        }

        let null_count = column.null_count();
        nodes.push(FieldNode {
            length: n as i64,
            null_count: null_count as i64,
        });
        buffers.push(self.make_null_buffer(field.nullable, column.validity.as_ref(), body)?);

        match (&field.dtype, &column.data) {
            (WireType::Bool, ColumnData::Bool(bits)) => {
                let n_bytes = (n + 7) / 8;
                if bits.bits.len() < n_bytes {
                    return Err(IoError::InputDataError(format!(
                        "column '{}': boolean buffer cannot cover {} rows",
                        field.name, n
                    )));
                }
                let desc = self.push_buffer(body, &bits.bits[..n_bytes])?;
                buffers.push(desc);
                Ok(())
            }
            (WireType::Int8, ColumnData::Int8(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::Int16, ColumnData::Int16(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::Int32, ColumnData::Int32(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::Int64, ColumnData::Int64(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::UInt8, ColumnData::UInt8(v)) => self.push_data(body, buffers, v),
            (WireType::UInt16, ColumnData::UInt16(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::UInt32, ColumnData::UInt32(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::UInt64, ColumnData::UInt64(v)) => self.push_data(body, buffers, as_bytes(v)),
            (WireType::Float32, ColumnData::Float32(v)) => {
                self.push_data(body, buffers, as_bytes(v))
            }
            (WireType::Float64, ColumnData::Float64(v)) => {
                self.push_data(body, buffers, as_bytes(v))
            }
            (WireType::Utf8, ColumnData::Utf8 { offsets, data })
            | (WireType::Binary, ColumnData::Binary { offsets, data }) => {
                check_offsets(&field.name, offsets, n, data.len())?;
                buffers.push(self.push_buffer(body, as_bytes(offsets))?);
                buffers.push(self.push_buffer(body, data)?);
                Ok(())
            }
            (WireType::FixedBinary(width), ColumnData::FixedBinary { width: w, data }) => {
                if width != w || data.len() != n * *width as usize {
                    return Err(IoError::InputDataError(format!(
                        "column '{}': fixed binary payload does not match width {}",
                        field.name, width
                    )));
                }
                buffers.push(self.push_buffer(body, data)?);
                Ok(())
            }
            (WireType::List(child_field), ColumnData::List { offsets, child }) => {
                check_offsets(&field.name, offsets, n, child.value_count())?;
                buffers.push(self.push_buffer(body, as_bytes(offsets))?);
                let child_rows = *offsets.last().unwrap_or(&0) as usize;
                self.encode_column(child_field, child, child_rows, nodes, buffers, body)
            }
            (WireType::Struct(child_fields), ColumnData::Struct(children)) => {
                if child_fields.len() != children.len() {
                    return Err(IoError::InputDataError(format!(
                        "column '{}': struct has {} children, schema expects {}",
                        field.name,
                        children.len(),
                        child_fields.len()
                    )));
                }
                for (child_field, child) in child_fields.iter().zip(children) {
                    self.encode_column(child_field, child, n, nodes, buffers, body)?;
                }
                Ok(())
            }
            (dtype, _) => Err(IoError::InputDataError(format!(
                "column '{}' payload does not match schema type {:?}",
                field.name, dtype
            ))),
        }
    }

    fn push_data(
        &self,
        body: &mut B,
        buffers: &mut Vec<BufferDescriptor>,
        bytes: &[u8],
    ) -> Result<(), IoError> {
        let desc = self.push_buffer(body, bytes)?;
        buffers.push(desc);
        Ok(())
    }

    /// Append one buffer region to the body, compressing when configured and
    /// worthwhile, and padding to the alignment boundary.
    ///
    /// Returns the descriptor recording offset, on-disk and raw lengths.
    /// Payloads the codec cannot shrink are stored raw with the flag unset,
    /// so the decoder never inflates a buffer that was never deflated.
    fn push_buffer(&self, body: &mut B, bytes: &[u8]) -> Result<BufferDescriptor, IoError> {
        let raw_len = bytes.len();
        let (payload, compressed): (Cow<'_, [u8]>, bool) =
            if self.codec != Compression::None && raw_len > 0 {
                let candidate = compress(bytes, self.codec)?;
                if candidate.len() < raw_len {
                    (Cow::Owned(candidate), true)
                } else {
                    (Cow::Borrowed(bytes), false)
                }
            } else {
                (Cow::Borrowed(bytes), false)
            };

        let offset = body.len();
        body.extend_from_slice(&payload);
        let pad = align_to::<B>(payload.len());
        if pad != 0 {
            body.extend_from_slice(&vec![0u8; pad]);
        }
        Ok(BufferDescriptor {
            offset: offset as u64,
            disk_len: payload.len() as u64,
            raw_len: raw_len as u64,
            compressed,
        })
    }

    /// Construct the validity buffer for a column.
    ///
    /// Emits the bitmask only when the field is nullable and the column
    /// carries a mask; otherwise records a zero-length placeholder.
    fn make_null_buffer(
        &self,
        nullable: bool,
        mask: Option<&Bitmask>,
        body: &mut B,
    ) -> Result<BufferDescriptor, IoError> {
        match mask {
            Some(mask) if nullable => {
                let n_bytes = (mask.len + 7) / 8;
                if mask.bits.len() < n_bytes {
                    return Err(IoError::InputDataError(format!(
                        "validity buffer cannot cover {} rows",
                        mask.len
                    )));
                }
                self.push_buffer(body, &mask.bits[..n_bytes])
            }
            _ => Ok(BufferDescriptor::absent()),
        }
    }
}

/// Validate an `n + 1`-entry offsets buffer: monotone non-decreasing from
/// zero, with the final offset covering the child payload exactly.
fn check_offsets(
    name: &str,
    offsets: &[i32],
    n: usize,
    payload_len: usize,
) -> Result<(), IoError> {
    if offsets.len() != n + 1 || offsets.first() != Some(&0) {
        return Err(IoError::InputDataError(format!(
            "column '{name}': offsets buffer must have {} entries starting at zero",
            n + 1
        )));
    }
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(IoError::InputDataError(format!(
            "column '{name}': offsets must be non-decreasing"
        )));
    }
    if *offsets.last().unwrap() as usize != payload_len {
        return Err(IoError::InputDataError(format!(
            "column '{name}': final offset {} does not cover payload of {} values",
            offsets.last().unwrap(),
            payload_len
        )));
    }
    Ok(())
}

/// Encode the metadata body of a record-batch message.
fn encode_batch_meta(
    n_rows: usize,
    codec: Compression,
    nodes: &[FieldNode],
    buffers: &[BufferDescriptor],
    body_len: usize,
) -> Vec<u8> {
    let mut meta = Vec::with_capacity(64 + nodes.len() * 16 + buffers.len() * 25);
    meta.push(MessageKind::RecordBatch.to_u8());
    meta.extend_from_slice(&(body_len as u64).to_le_bytes());
    meta.extend_from_slice(&(n_rows as u64).to_le_bytes());
    meta.push(codec.id());
    meta.extend_from_slice(&(nodes.len() as u32).to_le_bytes());
    for node in nodes {
        meta.extend_from_slice(&node.length.to_le_bytes());
        meta.extend_from_slice(&node.null_count.to_le_bytes());
    }
    meta.extend_from_slice(&(buffers.len() as u32).to_le_bytes());
    for buf in buffers {
        meta.extend_from_slice(&buf.offset.to_le_bytes());
        meta.extend_from_slice(&buf.disk_len.to_le_bytes());
        meta.extend_from_slice(&buf.raw_len.to_le_bytes());
        meta.push(buf.compressed as u8);
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bitmask, sample_schema};

    fn int_column(values: &[i64]) -> Column {
        Column::new(ColumnData::Int64(values.to_vec()), None)
    }

    #[test]
    fn test_schema_frame_is_queued_not_written() {
        let schema = Arc::new(sample_schema());
        let mut encoder = BatchEncoder::new(schema, Compression::None);
        encoder.encode_schema().unwrap();
        assert_eq!(encoder.pending_frames(), 1);

        let mut sink: Vec<u8> = Vec::new();
        let written = encoder.flush(&mut sink).unwrap();
        assert_eq!(written as usize, sink.len());
        assert_eq!(encoder.pending_frames(), 0);
        assert_eq!(sink.len() % 8, 0);
    }

    #[test]
    fn test_column_count_mismatch_rejected() {
        let schema = Arc::new(sample_schema());
        let mut encoder = BatchEncoder::new(schema, Compression::None);
        let batch = Batch::new(1, vec![int_column(&[1])]);
        let err = encoder.encode_batch(&batch).unwrap_err();
        assert!(matches!(err, IoError::InputDataError(_)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let schema = Arc::new(
            Schema::from_fields(vec![Field::new("v", WireType::Int64, false)], vec![]).unwrap(),
        );
        let mut encoder = BatchEncoder::new(schema, Compression::None);
        let batch = Batch::new(
            2,
            vec![Column::new(ColumnData::Float64(vec![1.0, 2.0]), None)],
        );
        let err = encoder.encode_batch(&batch).unwrap_err();
        assert!(matches!(err, IoError::InputDataError(_)));
    }

    #[test]
    fn test_zero_row_batch_encodes() {
        let schema = Arc::new(sample_schema());
        let mut encoder = BatchEncoder::new(Arc::clone(&schema), Compression::None);
        let (types, _) = schema.to_parts();
        let batch = Batch::empty_for(&types);
        encoder.encode_batch(&batch).unwrap();
        assert_eq!(encoder.pending_frames(), 1);
    }

    #[test]
    fn test_nullable_column_emits_validity() {
        let schema = Arc::new(
            Schema::from_fields(vec![Field::new("v", WireType::Int64, true)], vec![]).unwrap(),
        );
        let mut encoder = BatchEncoder::new(schema, Compression::None);
        let batch = Batch::new(
            3,
            vec![Column::new(
                ColumnData::Int64(vec![1, 0, 3]),
                Some(make_bitmask(&[true, false, true])),
            )],
        );
        encoder.encode_batch(&batch).unwrap();

        let mut sink: Vec<u8> = Vec::new();
        encoder.flush(&mut sink).unwrap();
        // validity bitmap (1 byte, padded to 8) + data (24 bytes) in the body
        assert!(sink.len() > 32);
    }

    #[test]
    fn test_offsets_validation() {
        let schema = Arc::new(
            Schema::from_fields(vec![Field::new("s", WireType::Utf8, false)], vec![]).unwrap(),
        );
        let mut encoder = BatchEncoder::new(schema, Compression::None);
        let batch = Batch::new(
            2,
            vec![Column::new(
                ColumnData::Utf8 {
                    offsets: vec![0, 5, 3], // decreasing
                    data: b"abc".to_vec(),
                },
                None,
            )],
        );
        let err = encoder.encode_batch(&batch).unwrap_err();
        assert!(matches!(err, IoError::InputDataError(_)));
    }
}
