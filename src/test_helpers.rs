//! Shared builders for unit tests: small schemas, batches, and an in-memory
//! byte source. Integration suites under `tests/` construct their own data
//! so they exercise the public API end to end.

use crate::error::IoError;
use crate::models::types::column::{Batch, Bitmask, Column, ColumnData};
use crate::models::types::schema::{Field, Schema, WireType};
use crate::traits::byte_stream::ByteSource;

pub(crate) fn make_bitmask(valid: &[bool]) -> Bitmask {
    Bitmask::from_bools(valid)
}

/// Three-column schema covering a primitive, a nullable primitive, and a
/// variable-length type, with one metadata pair.
pub(crate) fn sample_schema() -> Schema {
    Schema::from_fields(
        vec![
            Field::new("id", WireType::Int64, false),
            Field::new("score", WireType::Float64, true),
            Field::new("name", WireType::Utf8, true),
        ],
        vec![("origin".to_string(), "unit-test".to_string())],
    )
    .unwrap()
}

/// Four rows matching [`sample_schema`], nulls included.
pub(crate) fn sample_batch() -> Batch {
    let names = ["ada", "", "grace", "edsger"];
    let mut offsets = vec![0i32];
    let mut data = Vec::new();
    for name in names {
        data.extend_from_slice(name.as_bytes());
        offsets.push(data.len() as i32);
    }
    Batch::new(
        4,
        vec![
            Column::new(ColumnData::Int64(vec![1, 2, 3, 4]), None),
            Column::new(
                ColumnData::Float64(vec![0.5, 0.0, 0.25, 0.125]),
                Some(make_bitmask(&[true, false, true, true])),
            ),
            Column::new(ColumnData::Utf8 { offsets, data }, None),
        ],
    )
}

/// Schema with list and struct nesting.
pub(crate) fn nested_schema() -> Schema {
    Schema::from_fields(
        vec![
            Field::new(
                "tags",
                WireType::List(Box::new(Field::new("item", WireType::Utf8, true))),
                true,
            ),
            Field::new(
                "point",
                WireType::Struct(vec![
                    Field::new("x", WireType::Float64, false),
                    Field::new("y", WireType::Float64, false),
                ]),
                false,
            ),
        ],
        vec![],
    )
    .unwrap()
}

/// A `ByteSource` over an owned byte vector.
pub(crate) struct MemoryByteSource {
    data: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl MemoryByteSource {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            closed: false,
        }
    }
}

impl ByteSource for MemoryByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        if self.closed {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.closed = true;
        Ok(())
    }
}
