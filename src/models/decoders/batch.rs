//! Record-batch message reconstruction.
//!
//! Rebuilds an in-memory [`Batch`] from a record-batch message's metadata
//! and body, walking the schema's fields in the same preorder as the batch
//! encoder and pulling field nodes and buffer descriptors from their
//! cursors. Compressed buffers are inflated through the injected
//! [`DecompressorRegistry`]; declared sizes are enforced before and after
//! decompression, so a lying descriptor surfaces as an error rather than a
//! truncated or overrun column.

use std::borrow::Cow;

use crate::compression::{Compression, DecompressorRegistry};
use crate::constants::METADATA_HEADER_LEN;
use crate::enums::MessageKind;
use crate::error::IoError;
use crate::models::decoders::schema::{read_message_kind, MetaReader};
use crate::models::frames::wire_message::{BufferDescriptor, FieldNode};
use crate::models::types::column::{Batch, Bitmask, Column, ColumnData};
use crate::models::types::schema::{Field, Schema, WireType};

/// Parsed header of a record-batch message.
#[derive(Debug)]
pub struct BatchHeader {
    pub n_rows: usize,
    pub codec_id: u8,
    pub nodes: Vec<FieldNode>,
    pub buffers: Vec<BufferDescriptor>,
    pub body_len: usize,
}

/// Parse the metadata body of a record-batch message.
pub fn parse_batch_meta(meta: &[u8]) -> Result<BatchHeader, IoError> {
    match read_message_kind(meta)? {
        MessageKind::RecordBatch => {}
        other => {
            return Err(IoError::MalformedStream(format!(
                "expected record-batch message, got {other:?}"
            )))
        }
    }
    let body_len = u64::from_le_bytes(meta[1..9].try_into().unwrap()) as usize;

    let mut reader = MetaReader::new(&meta[METADATA_HEADER_LEN..]);
    let n_rows = reader.u64()? as usize;
    let codec_id = reader.u8()?;

    let node_count = reader.u32()? as usize;
    let mut nodes = Vec::with_capacity(node_count.min(4096));
    for _ in 0..node_count {
        let length = reader.i64()?;
        let null_count = reader.i64()?;
        if length < 0 || null_count < 0 {
            return Err(IoError::MalformedStream(format!(
                "negative field node ({length}, {null_count})"
            )));
        }
        nodes.push(FieldNode { length, null_count });
    }

    let buffer_count = reader.u32()? as usize;
    let mut buffers = Vec::with_capacity(buffer_count.min(4096));
    for _ in 0..buffer_count {
        let offset = reader.u64()?;
        let disk_len = reader.u64()?;
        let raw_len = reader.u64()?;
        let compressed = reader.u8()? != 0;
        buffers.push(BufferDescriptor {
            offset,
            disk_len,
            raw_len,
            compressed,
        });
    }

    Ok(BatchHeader {
        n_rows,
        codec_id,
        nodes,
        buffers,
        body_len,
    })
}

/// Rebuild a [`Batch`] from a parsed header and its body bytes.
pub fn decode_batch(
    header: &BatchHeader,
    body: &[u8],
    schema: &Schema,
    registry: &DecompressorRegistry,
) -> Result<Batch, IoError> {
    if header.body_len != body.len() {
        return Err(IoError::MalformedStream(format!(
            "declared body of {} bytes but {} bytes on the wire",
            header.body_len,
            body.len()
        )));
    }
    // An unrecognised codec is a hard decode error even when every buffer in
    // this particular batch happens to be stored raw.
    if header.codec_id != Compression::None.id() && !registry.contains(header.codec_id) {
        return Err(IoError::Compression(format!(
            "unrecognised codec id {} in record-batch message",
            header.codec_id
        )));
    }

    let mut cursor = BatchCursor {
        header,
        body,
        registry,
        node_idx: 0,
        buffer_idx: 0,
    };

    let mut columns = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        columns.push(cursor.decode_column(field, header.n_rows)?);
    }

    if cursor.node_idx != header.nodes.len() || cursor.buffer_idx != header.buffers.len() {
        return Err(IoError::MalformedStream(format!(
            "message declares {} nodes / {} buffers but the schema consumes {} / {}",
            header.nodes.len(),
            header.buffers.len(),
            cursor.node_idx,
            cursor.buffer_idx
        )));
    }

    Ok(Batch::new(header.n_rows, columns))
}

/// Walks nodes and buffers in schema preorder while rebuilding columns.
struct BatchCursor<'a> {
    header: &'a BatchHeader,
    body: &'a [u8],
    registry: &'a DecompressorRegistry,
    node_idx: usize,
    buffer_idx: usize,
}

impl<'a> BatchCursor<'a> {
    fn next_node(&mut self) -> Result<FieldNode, IoError> {
        let node = self.header.nodes.get(self.node_idx).copied().ok_or_else(|| {
            IoError::MalformedStream("record batch has fewer field nodes than fields".to_string())
        })?;
        self.node_idx += 1;
        Ok(node)
    }

    fn next_buffer(&mut self) -> Result<BufferDescriptor, IoError> {
        let desc = self
            .header
            .buffers
            .get(self.buffer_idx)
            .copied()
            .ok_or_else(|| {
                IoError::MalformedStream(
                    "record batch has fewer buffers than the schema requires".to_string(),
                )
            })?;
        self.buffer_idx += 1;
        Ok(desc)
    }

    /// Fetch one buffer's bytes, decompressing when flagged.
    fn read_buffer(&mut self) -> Result<Cow<'a, [u8]>, IoError> {
        let desc = self.next_buffer()?;
        let start = desc.offset as usize;
        let end = start
            .checked_add(desc.disk_len as usize)
            .ok_or_else(|| IoError::MalformedStream("buffer extent overflow".to_string()))?;
        if end > self.body.len() {
            return Err(IoError::MalformedStream(format!(
                "buffer [{start}, {end}) overruns body of {} bytes",
                self.body.len()
            )));
        }
        let slice = &self.body[start..end];

        if desc.compressed {
            if self.header.codec_id == Compression::None.id() {
                return Err(IoError::MalformedStream(
                    "buffer flagged compressed in an uncompressed message".to_string(),
                ));
            }
            let out = self
                .registry
                .decompress(self.header.codec_id, slice, desc.raw_len as usize)?;
            Ok(Cow::Owned(out))
        } else {
            if desc.disk_len != desc.raw_len {
                return Err(IoError::MalformedStream(format!(
                    "raw buffer declares {} on-disk bytes but {} uncompressed",
                    desc.disk_len, desc.raw_len
                )));
            }
            Ok(Cow::Borrowed(slice))
        }
    }

    /// Optional validity mask: a zero-length descriptor means all-valid.
    fn read_validity(&mut self, n: usize) -> Result<Option<Bitmask>, IoError> {
        let desc = self
            .header
            .buffers
            .get(self.buffer_idx)
            .copied()
            .ok_or_else(|| {
                IoError::MalformedStream(
                    "record batch has fewer buffers than the schema requires".to_string(),
                )
            })?;
        if desc.disk_len == 0 && desc.raw_len == 0 {
            self.buffer_idx += 1;
            return Ok(None);
        }
        let bytes = self.read_buffer()?;
        let needed = (n + 7) / 8;
        if bytes.len() < needed {
            return Err(IoError::MalformedStream(format!(
                "validity buffer of {} bytes cannot cover {} rows",
                bytes.len(),
                n
            )));
        }
        Ok(Some(Bitmask::from_bytes(bytes.into_owned(), n)))
    }

    fn decode_column(&mut self, field: &Field, expected_rows: usize) -> Result<Column, IoError> {
        let node = self.next_node()?;
        let n = node.length as usize;
        if n != expected_rows {
            return Err(IoError::MalformedStream(format!(
                "field '{}' declares {} rows, expected {}",
                field.name, n, expected_rows
            )));
        }
        let validity = self.read_validity(n)?;

        let data = match &field.dtype {
            WireType::Bool => {
                let bytes = self.read_buffer()?;
                let needed = (n + 7) / 8;
                if bytes.len() != needed {
                    return Err(IoError::MalformedStream(format!(
                        "boolean buffer of {} bytes for {} rows",
                        bytes.len(),
                        n
                    )));
                }
                ColumnData::Bool(Bitmask::from_bytes(bytes.into_owned(), n))
            }
            WireType::Int8 => {
                ColumnData::Int8(self.read_primitives(field, n, 1, |b| b[0] as i8)?)
            }
            WireType::Int16 => self
                .read_primitives(field, n, 2, |b| i16::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::Int16)?,
            WireType::Int32 => self
                .read_primitives(field, n, 4, |b| i32::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::Int32)?,
            WireType::Int64 => self
                .read_primitives(field, n, 8, |b| i64::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::Int64)?,
            WireType::UInt8 => {
                let bytes = self.read_sized(field, n, 1)?;
                ColumnData::UInt8(bytes.into_owned())
            }
            WireType::UInt16 => self
                .read_primitives(field, n, 2, |b| u16::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::UInt16)?,
            WireType::UInt32 => self
                .read_primitives(field, n, 4, |b| u32::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::UInt32)?,
            WireType::UInt64 => self
                .read_primitives(field, n, 8, |b| u64::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::UInt64)?,
            WireType::Float32 => self
                .read_primitives(field, n, 4, |b| f32::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::Float32)?,
            WireType::Float64 => self
                .read_primitives(field, n, 8, |b| f64::from_le_bytes(b.try_into().unwrap()))
                .map(ColumnData::Float64)?,
            WireType::Utf8 => {
                let (offsets, data) = self.read_var_binary(field, n)?;
                ColumnData::Utf8 { offsets, data }
            }
            WireType::Binary => {
                let (offsets, data) = self.read_var_binary(field, n)?;
                ColumnData::Binary { offsets, data }
            }
            WireType::FixedBinary(width) => {
                let bytes = self.read_sized(field, n, *width as usize)?;
                ColumnData::FixedBinary {
                    width: *width,
                    data: bytes.into_owned(),
                }
            }
            WireType::List(child_field) => {
                let offsets = self.read_offsets(field, n)?;
                let child_rows = *offsets.last().unwrap() as usize;
                let child = self.decode_column(child_field, child_rows)?;
                ColumnData::List {
                    offsets,
                    child: Box::new(child),
                }
            }
            WireType::Struct(child_fields) => {
                let mut children = Vec::with_capacity(child_fields.len());
                for child_field in child_fields {
                    children.push(self.decode_column(child_field, n)?);
                }
                ColumnData::Struct(children)
            }
        };

        Ok(Column::new(data, validity))
    }

    /// A data buffer expected to hold exactly `n * width` bytes.
    fn read_sized(
        &mut self,
        field: &Field,
        n: usize,
        width: usize,
    ) -> Result<Cow<'a, [u8]>, IoError> {
        let bytes = self.read_buffer()?;
        if bytes.len() != n * width {
            return Err(IoError::MalformedStream(format!(
                "field '{}': data buffer of {} bytes for {} values of width {}",
                field.name,
                bytes.len(),
                n,
                width
            )));
        }
        Ok(bytes)
    }

    fn read_primitives<T>(
        &mut self,
        field: &Field,
        n: usize,
        width: usize,
        parse: impl Fn(&[u8]) -> T,
    ) -> Result<Vec<T>, IoError> {
        let bytes = self.read_sized(field, n, width)?;
        Ok(bytes.chunks_exact(width).map(parse).collect())
    }

    /// An `n + 1`-entry i32 offsets buffer, validated monotone from zero.
    fn read_offsets(&mut self, field: &Field, n: usize) -> Result<Vec<i32>, IoError> {
        let offsets = self.read_primitives(field, n + 1, 4, |b| {
            i32::from_le_bytes(b.try_into().unwrap())
        })?;
        if offsets.first() != Some(&0) || offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(IoError::MalformedStream(format!(
                "field '{}': offsets are not monotone from zero",
                field.name
            )));
        }
        Ok(offsets)
    }

    fn read_var_binary(
        &mut self,
        field: &Field,
        n: usize,
    ) -> Result<(Vec<i32>, Vec<u8>), IoError> {
        let offsets = self.read_offsets(field, n)?;
        let expected = *offsets.last().unwrap() as usize;
        let data = self.read_buffer()?;
        if data.len() != expected {
            return Err(IoError::MalformedStream(format!(
                "field '{}': final offset {} but data buffer holds {} bytes",
                field.name,
                expected,
                data.len()
            )));
        }
        Ok((offsets, data.into_owned()))
    }
}
