//! # In-memory Columnar Batch Model
//!
//! The value side of the codec: a [`Batch`] of [`Column`]s whose physical
//! layout mirrors the wire buffers one-for-one (validity bitmap, offsets,
//! data, child columns), so the encoders can emit buffer slices directly and
//! the decoders can rebuild columns without an intermediate representation.
//!
//! Buffers here use the same conventions as the wire: LSB0 bit-packing for
//! validity and boolean data, `i32` offsets with `n + 1` entries for
//! variable-length and list types.

use crate::models::types::schema::WireType;
use crate::utils::pack_bits;

/// LSB0 bit-packed validity (or boolean-value) buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bitmask {
    pub bits: Vec<u8>,
    pub len: usize,
}

impl Bitmask {
    /// Build from per-row booleans (`true` = valid / set).
    pub fn from_bools(values: &[bool]) -> Self {
        Self {
            bits: pack_bits(values.iter().copied(), values.len()),
            len: values.len(),
        }
    }

    /// Build from raw LSB0 bytes covering `len` positions.
    pub fn from_bytes(bits: Vec<u8>, len: usize) -> Self {
        debug_assert!(bits.len() * 8 >= len);
        Self { bits, len }
    }

    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.bits[idx / 8] >> (idx % 8)) & 1 != 0
    }

    /// Number of unset (null) positions.
    pub fn null_count(&self) -> usize {
        (0..self.len).filter(|&i| !self.get(i)).count()
    }

    pub fn clear(&mut self) {
        self.bits.clear();
        self.len = 0;
    }
}

/// Physical column payload, one variant per [`WireType`] family.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Bit-packed boolean values (LSB0).
    Bool(Bitmask),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// UTF-8 values: `offsets` has `n + 1` entries into `data`.
    Utf8 { offsets: Vec<i32>, data: Vec<u8> },
    /// Opaque byte values: `offsets` has `n + 1` entries into `data`.
    Binary { offsets: Vec<i32>, data: Vec<u8> },
    /// Fixed-width byte values: `data.len() == n * width`.
    FixedBinary { width: u32, data: Vec<u8> },
    /// List values: `offsets` has `n + 1` entries into the child column.
    List { offsets: Vec<i32>, child: Box<Column> },
    /// One child column per struct member, all of the parent's length.
    Struct(Vec<Column>),
}

impl ColumnData {
    /// Number of logical values held.
    pub fn value_count(&self) -> usize {
        match self {
            ColumnData::Bool(b) => b.len,
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8 { offsets, .. } | ColumnData::Binary { offsets, .. } => {
                offsets.len().saturating_sub(1)
            }
            ColumnData::FixedBinary { width, data } => {
                if *width == 0 { 0 } else { data.len() / *width as usize }
            }
            ColumnData::List { offsets, .. } => offsets.len().saturating_sub(1),
            ColumnData::Struct(children) => {
                children.first().map(|c| c.value_count()).unwrap_or(0)
            }
        }
    }

    /// Empty payload of the given type's shape. Variable-length and list
    /// payloads start with the single zero offset.
    pub fn empty_for(dtype: &WireType) -> Self {
        match dtype {
            WireType::Bool => ColumnData::Bool(Bitmask::default()),
            WireType::Int8 => ColumnData::Int8(Vec::new()),
            WireType::Int16 => ColumnData::Int16(Vec::new()),
            WireType::Int32 => ColumnData::Int32(Vec::new()),
            WireType::Int64 => ColumnData::Int64(Vec::new()),
            WireType::UInt8 => ColumnData::UInt8(Vec::new()),
            WireType::UInt16 => ColumnData::UInt16(Vec::new()),
            WireType::UInt32 => ColumnData::UInt32(Vec::new()),
            WireType::UInt64 => ColumnData::UInt64(Vec::new()),
            WireType::Float32 => ColumnData::Float32(Vec::new()),
            WireType::Float64 => ColumnData::Float64(Vec::new()),
            WireType::Utf8 => ColumnData::Utf8 { offsets: vec![0], data: Vec::new() },
            WireType::Binary => ColumnData::Binary { offsets: vec![0], data: Vec::new() },
            WireType::FixedBinary(w) => ColumnData::FixedBinary { width: *w, data: Vec::new() },
            WireType::List(child) => ColumnData::List {
                offsets: vec![0],
                child: Box::new(Column::empty_for(&child.dtype)),
            },
            WireType::Struct(children) => ColumnData::Struct(
                children.iter().map(|c| Column::empty_for(&c.dtype)).collect(),
            ),
        }
    }

    /// Reset contents in place, keeping the type shape so the allocation can
    /// be refilled for the next chunk.
    pub fn clear(&mut self) {
        match self {
            ColumnData::Bool(b) => b.clear(),
            ColumnData::Int8(v) => v.clear(),
            ColumnData::Int16(v) => v.clear(),
            ColumnData::Int32(v) => v.clear(),
            ColumnData::Int64(v) => v.clear(),
            ColumnData::UInt8(v) => v.clear(),
            ColumnData::UInt16(v) => v.clear(),
            ColumnData::UInt32(v) => v.clear(),
            ColumnData::UInt64(v) => v.clear(),
            ColumnData::Float32(v) => v.clear(),
            ColumnData::Float64(v) => v.clear(),
            ColumnData::Utf8 { offsets, data } | ColumnData::Binary { offsets, data } => {
                offsets.clear();
                offsets.push(0);
                data.clear();
            }
            ColumnData::FixedBinary { data, .. } => data.clear(),
            ColumnData::List { offsets, child } => {
                offsets.clear();
                offsets.push(0);
                child.clear();
            }
            ColumnData::Struct(children) => {
                for child in children {
                    child.clear();
                }
            }
        }
    }
}

/// A column: payload plus optional validity mask.
///
/// `validity: None` means every position is valid. A nullable field with no
/// nulls in a given batch may carry either representation; the wire encodes
/// the absence as a zero-length validity buffer either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub data: ColumnData,
    pub validity: Option<Bitmask>,
}

impl Column {
    pub fn new(data: ColumnData, validity: Option<Bitmask>) -> Self {
        Self { data, validity }
    }

    pub fn empty_for(dtype: &WireType) -> Self {
        Self {
            data: ColumnData::empty_for(dtype),
            validity: None,
        }
    }

    pub fn value_count(&self) -> usize {
        self.data.value_count()
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|m| m.null_count()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.validity = None;
    }
}

/// One chunk of rows: equal-length columns in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub n_rows: usize,
    pub columns: Vec<Column>,
}

impl Batch {
    pub fn new(n_rows: usize, columns: Vec<Column>) -> Self {
        Self { n_rows, columns }
    }

    /// An empty batch shaped for `dtypes`, ready to be filled.
    pub fn empty_for(dtypes: &[WireType]) -> Self {
        Self {
            n_rows: 0,
            columns: dtypes.iter().map(Column::empty_for).collect(),
        }
    }

    /// Reset contents in place after a flush, keeping column shapes, so the
    /// batch can be reused for the next chunk.
    pub fn clear(&mut self) {
        self.n_rows = 0;
        for col in &mut self.columns {
            col.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask_null_count() {
        let mask = Bitmask::from_bools(&[true, false, true, true, false]);
        assert_eq!(mask.len, 5);
        assert_eq!(mask.null_count(), 2);
        assert!(mask.get(0));
        assert!(!mask.get(1));
    }

    #[test]
    fn test_value_counts() {
        let utf8 = ColumnData::Utf8 {
            offsets: vec![0, 3, 3, 8],
            data: b"foobarba".to_vec(),
        };
        assert_eq!(utf8.value_count(), 3);

        let fixed = ColumnData::FixedBinary {
            width: 4,
            data: vec![0u8; 12],
        };
        assert_eq!(fixed.value_count(), 3);

        let list = ColumnData::List {
            offsets: vec![0, 2, 5],
            child: Box::new(Column::new(ColumnData::Int32(vec![1, 2, 3, 4, 5]), None)),
        };
        assert_eq!(list.value_count(), 2);
    }

    #[test]
    fn test_clear_keeps_shape() {
        let mut batch = Batch::new(
            2,
            vec![
                Column::new(ColumnData::Int64(vec![1, 2]), None),
                Column::new(
                    ColumnData::Utf8 {
                        offsets: vec![0, 1, 2],
                        data: b"ab".to_vec(),
                    },
                    Some(Bitmask::from_bools(&[true, false])),
                ),
            ],
        );
        batch.clear();
        assert_eq!(batch.n_rows, 0);
        assert_eq!(batch.columns[0].value_count(), 0);
        assert!(matches!(batch.columns[0].data, ColumnData::Int64(_)));
        match &batch.columns[1].data {
            ColumnData::Utf8 { offsets, data } => {
                assert_eq!(offsets, &vec![0]);
                assert!(data.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(batch.columns[1].validity.is_none());
    }
}
