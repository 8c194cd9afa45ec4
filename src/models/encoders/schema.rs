//! Schema metadata-body encoding.
//!
//! Produces the metadata body of a schema message: a deterministic
//! little-endian encoding of the field tree and the key/value metadata
//! pairs, prefixed by the common message header (kind byte + body length).
//! A schema message has no data body, so its body length is always zero.
//!
//! Wire layout:
//!
//! ```text
//! u8  kind (= 0)        u64 body_len (= 0)
//! u32 field_count       field*
//! u32 pair_count        (u32 key_len ++ key ++ u32 value_len ++ value)*
//!
//! field:
//! u32 name_len ++ name ++ u8 nullable ++ u8 type_tag
//!   ++ u32 width        (FixedBinary only)
//!   ++ u32 child_count ++ field*   (children, preorder)
//! ```

use crate::enums::MessageKind;
use crate::models::types::schema::{Field, Schema, WireType};

// Type tags shared with the schema parser.
pub(crate) const TAG_BOOL: u8 = 0;
pub(crate) const TAG_INT8: u8 = 1;
pub(crate) const TAG_INT16: u8 = 2;
pub(crate) const TAG_INT32: u8 = 3;
pub(crate) const TAG_INT64: u8 = 4;
pub(crate) const TAG_UINT8: u8 = 5;
pub(crate) const TAG_UINT16: u8 = 6;
pub(crate) const TAG_UINT32: u8 = 7;
pub(crate) const TAG_UINT64: u8 = 8;
pub(crate) const TAG_FLOAT32: u8 = 9;
pub(crate) const TAG_FLOAT64: u8 = 10;
pub(crate) const TAG_UTF8: u8 = 11;
pub(crate) const TAG_BINARY: u8 = 12;
pub(crate) const TAG_FIXED_BINARY: u8 = 13;
pub(crate) const TAG_LIST: u8 = 14;
pub(crate) const TAG_STRUCT: u8 = 15;

fn tag_of(dtype: &WireType) -> u8 {
    match dtype {
        WireType::Bool => TAG_BOOL,
        WireType::Int8 => TAG_INT8,
        WireType::Int16 => TAG_INT16,
        WireType::Int32 => TAG_INT32,
        WireType::Int64 => TAG_INT64,
        WireType::UInt8 => TAG_UINT8,
        WireType::UInt16 => TAG_UINT16,
        WireType::UInt32 => TAG_UINT32,
        WireType::UInt64 => TAG_UINT64,
        WireType::Float32 => TAG_FLOAT32,
        WireType::Float64 => TAG_FLOAT64,
        WireType::Utf8 => TAG_UTF8,
        WireType::Binary => TAG_BINARY,
        WireType::FixedBinary(_) => TAG_FIXED_BINARY,
        WireType::List(_) => TAG_LIST,
        WireType::Struct(_) => TAG_STRUCT,
    }
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn encode_field(out: &mut Vec<u8>, field: &Field) {
    put_bytes(out, field.name.as_bytes());
    out.push(field.nullable as u8);
    out.push(tag_of(&field.dtype));
    match &field.dtype {
        WireType::FixedBinary(width) => {
            out.extend_from_slice(&width.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // no children
        }
        WireType::List(child) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            encode_field(out, child);
        }
        WireType::Struct(children) => {
            out.extend_from_slice(&(children.len() as u32).to_le_bytes());
            for child in children {
                encode_field(out, child);
            }
        }
        _ => {
            out.extend_from_slice(&0u32.to_le_bytes()); // no children
        }
    }
}

/// Encode the full metadata body of a schema message.
pub fn encode_schema_meta(schema: &Schema) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.push(MessageKind::Schema.to_u8());
    out.extend_from_slice(&0u64.to_le_bytes()); // schema messages carry no body

    out.extend_from_slice(&(schema.fields.len() as u32).to_le_bytes());
    for field in &schema.fields {
        encode_field(&mut out, field);
    }
    out.extend_from_slice(&(schema.metadata.len() as u32).to_le_bytes());
    for (key, value) in &schema.metadata {
        put_bytes(&mut out, key.as_bytes());
        put_bytes(&mut out, value.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::METADATA_HEADER_LEN;

    #[test]
    fn test_header_prefix_is_fixed() {
        let schema = Schema::from_fields(
            vec![Field::new("a", WireType::Int32, false)],
            vec![("k".into(), "v".into())],
        )
        .unwrap();
        let meta = encode_schema_meta(&schema);
        assert_eq!(meta[0], MessageKind::Schema.to_u8());
        assert_eq!(&meta[1..METADATA_HEADER_LEN], &0u64.to_le_bytes());
        // field count follows the fixed prefix
        assert_eq!(
            u32::from_le_bytes(meta[9..13].try_into().unwrap()),
            1
        );
    }

    #[test]
    fn test_nested_fields_encode_preorder() {
        let inner = Field::new("item", WireType::Utf8, true);
        let schema = Schema::from_fields(
            vec![Field::new("tags", WireType::List(Box::new(inner)), true)],
            vec![],
        )
        .unwrap();
        let meta = encode_schema_meta(&schema);
        // "tags" appears before "item" in the byte stream
        let pos_tags = meta.windows(4).position(|w| w == b"tags").unwrap();
        let pos_item = meta.windows(4).position(|w| w == b"item").unwrap();
        assert!(pos_tags < pos_item);
    }
}
