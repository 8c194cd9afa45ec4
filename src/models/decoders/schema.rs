//! Schema metadata-body parsing.
//!
//! Inverse of `models::encoders::schema`: reconstructs a [`Schema`] from the
//! metadata body of a schema message. Every read is bounds-checked against
//! the metadata slice; overruns surface as [`IoError::MalformedStream`],
//! never as a panic, so arbitrary bytes can be fed safely.

use crate::constants::METADATA_HEADER_LEN;
use crate::enums::MessageKind;
use crate::error::IoError;
use crate::models::encoders::schema::{
    TAG_BINARY, TAG_BOOL, TAG_FIXED_BINARY, TAG_FLOAT32, TAG_FLOAT64, TAG_INT16, TAG_INT32,
    TAG_INT64, TAG_INT8, TAG_LIST, TAG_STRUCT, TAG_UINT16, TAG_UINT32, TAG_UINT64, TAG_UINT8,
    TAG_UTF8,
};
use crate::models::types::schema::{Field, Schema, WireType};

/// Bounds-checked little-endian reader over a metadata body.
pub(crate) struct MetaReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MetaReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], IoError> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            IoError::MalformedStream("metadata length overflow".to_string())
        })?;
        if end > self.buf.len() {
            return Err(IoError::MalformedStream(format!(
                "metadata truncated: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, IoError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32, IoError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, IoError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, IoError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// A `u32`-length-prefixed byte run.
    pub(crate) fn bytes(&mut self) -> Result<&'a [u8], IoError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// A `u32`-length-prefixed UTF-8 string.
    pub(crate) fn string(&mut self) -> Result<String, IoError> {
        Ok(String::from_utf8(self.bytes()?.to_vec())?)
    }
}

/// Check the fixed metadata prefix and return the message kind.
pub(crate) fn read_message_kind(meta: &[u8]) -> Result<MessageKind, IoError> {
    if meta.len() < METADATA_HEADER_LEN {
        return Err(IoError::MalformedStream(format!(
            "metadata body of {} bytes is shorter than the {}-byte header",
            meta.len(),
            METADATA_HEADER_LEN
        )));
    }
    MessageKind::from_u8(meta[0])
}

fn parse_field(reader: &mut MetaReader<'_>, depth: usize) -> Result<Field, IoError> {
    // Defends against adversarial deeply-recursive field trees.
    if depth > 64 {
        return Err(IoError::MalformedStream(
            "field nesting exceeds 64 levels".to_string(),
        ));
    }
    let name = reader.string()?;
    let nullable = reader.u8()? != 0;
    let tag = reader.u8()?;

    let width = if tag == TAG_FIXED_BINARY {
        Some(reader.u32()?)
    } else {
        None
    };

    let child_count = reader.u32()? as usize;
    let mut children = Vec::with_capacity(child_count.min(64));
    for _ in 0..child_count {
        children.push(parse_field(reader, depth + 1)?);
    }

    let dtype = match tag {
        TAG_BOOL => WireType::Bool,
        TAG_INT8 => WireType::Int8,
        TAG_INT16 => WireType::Int16,
        TAG_INT32 => WireType::Int32,
        TAG_INT64 => WireType::Int64,
        TAG_UINT8 => WireType::UInt8,
        TAG_UINT16 => WireType::UInt16,
        TAG_UINT32 => WireType::UInt32,
        TAG_UINT64 => WireType::UInt64,
        TAG_FLOAT32 => WireType::Float32,
        TAG_FLOAT64 => WireType::Float64,
        TAG_UTF8 => WireType::Utf8,
        TAG_BINARY => WireType::Binary,
        TAG_FIXED_BINARY => WireType::FixedBinary(width.unwrap_or(0)),
        TAG_LIST => match (children.pop(), children.len()) {
            (Some(child), 0) => WireType::List(Box::new(child)),
            _ => {
                return Err(IoError::MalformedStream(format!(
                    "list field '{name}' must have exactly one child, has {child_count}"
                )))
            }
        },
        TAG_STRUCT => WireType::Struct(std::mem::take(&mut children)),
        other => {
            return Err(IoError::MalformedStream(format!(
                "unknown type tag {other} for field '{name}'"
            )))
        }
    };

    // Scalar tags must not carry children.
    if !matches!(dtype, WireType::List(_) | WireType::Struct(_)) && !children.is_empty() {
        return Err(IoError::MalformedStream(format!(
            "scalar field '{name}' carries {} children",
            children.len()
        )));
    }

    Ok(Field {
        name,
        dtype,
        nullable,
    })
}

/// Parse the metadata body of a schema message into a [`Schema`].
///
/// Trailing padding bytes after the encoded schema are permitted (frames pad
/// the metadata section to the alignment boundary).
pub fn parse_schema_meta(meta: &[u8]) -> Result<Schema, IoError> {
    match read_message_kind(meta)? {
        MessageKind::Schema => {}
        other => {
            return Err(IoError::MalformedStream(format!(
                "expected schema message, got {other:?}"
            )))
        }
    }

    let mut reader = MetaReader::new(&meta[METADATA_HEADER_LEN..]);
    let field_count = reader.u32()? as usize;
    if field_count == 0 {
        return Err(IoError::MalformedStream(
            "schema message declares zero fields".to_string(),
        ));
    }
    let mut fields = Vec::with_capacity(field_count.min(4096));
    for _ in 0..field_count {
        fields.push(parse_field(&mut reader, 0)?);
    }

    let pair_count = reader.u32()? as usize;
    let mut metadata = Vec::with_capacity(pair_count.min(4096));
    for _ in 0..pair_count {
        let key = reader.string()?;
        let value = reader.string()?;
        metadata.push((key, value));
    }

    Ok(Schema { fields, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::encoders::schema::encode_schema_meta;
    use crate::test_helpers::{nested_schema, sample_schema};

    #[test]
    fn test_schema_meta_roundtrip() {
        let schema = sample_schema();
        let meta = encode_schema_meta(&schema);
        let parsed = parse_schema_meta(&meta).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_nested_schema_roundtrip() {
        let schema = nested_schema();
        let meta = encode_schema_meta(&schema);
        let parsed = parse_schema_meta(&meta).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_metadata_pairs_preserve_order_and_duplicates() {
        let mut schema = sample_schema();
        schema.metadata = vec![
            ("k".into(), "first".into()),
            ("k".into(), "second".into()),
            ("other".into(), "x".into()),
        ];
        let meta = encode_schema_meta(&schema);
        let parsed = parse_schema_meta(&meta).unwrap();
        assert_eq!(parsed.metadata, schema.metadata);
    }

    #[test]
    fn test_trailing_padding_tolerated() {
        let schema = sample_schema();
        let mut meta = encode_schema_meta(&schema);
        meta.extend_from_slice(&[0u8; 7]);
        let parsed = parse_schema_meta(&meta).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_truncated_schema_is_error() {
        let schema = sample_schema();
        let meta = encode_schema_meta(&schema);
        let err = parse_schema_meta(&meta[..meta.len() / 2]).unwrap_err();
        assert!(matches!(err, IoError::MalformedStream(_)));
    }

    #[test]
    fn test_wrong_kind_is_error() {
        let mut meta = vec![1u8]; // record-batch kind
        meta.extend_from_slice(&[0u8; 16]);
        let err = parse_schema_meta(&meta).unwrap_err();
        assert!(matches!(err, IoError::MalformedStream(_)));
    }
}
