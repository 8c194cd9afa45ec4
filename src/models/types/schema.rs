//! # Schema Model
//!
//! In-memory description of a stream's fields, nested types, and metadata.
//!
//! A [`Schema`] is produced once per stream, is immutable for the stream's
//! life, and is shared (via `Arc`) by the writer and every batch encoder
//! bound to it. The wire encoding of the schema lives in
//! `models::encoders::schema`; this module only defines the model and the
//! converter between `(types, names, metadata)` parts and a `Schema` value.

use crate::error::IoError;

/// Logical wire type of a field.
///
/// A tagged variant rather than a trait hierarchy: buffer-layout computation
/// dispatches over this enum in the encoders and decoders, and composite
/// variants carry their child fields directly.
#[derive(Debug, Clone, PartialEq)]
pub enum WireType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Variable-length UTF-8 string (i32 offsets).
    Utf8,
    /// Variable-length opaque bytes (i32 offsets).
    Binary,
    /// Fixed-width opaque bytes; width in bytes per value.
    FixedBinary(u32),
    /// Variable-length list of a single child field (i32 offsets).
    List(Box<Field>),
    /// Composite of named child fields.
    Struct(Vec<Field>),
}

impl WireType {
    /// Byte width of a primitive value, or `None` for variable-length and
    /// composite types. `Bool` is bit-packed and reports `None`.
    pub fn primitive_width(&self) -> Option<usize> {
        match self {
            WireType::Int8 | WireType::UInt8 => Some(1),
            WireType::Int16 | WireType::UInt16 => Some(2),
            WireType::Int32 | WireType::UInt32 | WireType::Float32 => Some(4),
            WireType::Int64 | WireType::UInt64 | WireType::Float64 => Some(8),
            WireType::FixedBinary(w) => Some(*w as usize),
            _ => None,
        }
    }
}

/// A named, typed, possibly-nullable field.
///
/// The set and order of fields is identical in the schema message and in
/// every record-batch message of the same stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: WireType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: WireType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable,
        }
    }
}

/// Ordered fields plus ordered key/value metadata.
///
/// Metadata keys need not be unique on the wire; pairs round-trip in input
/// order, duplicates included.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub fields: Vec<Field>,
    pub metadata: Vec<(String, String)>,
}

impl Schema {
    /// Build a schema from parallel type/name lists and metadata pairs.
    ///
    /// Pure transform: no I/O, no shared state touched. Name uniqueness is
    /// not required (deduplication is the query engine's concern).
    ///
    /// # Errors
    /// - [`IoError::EmptySchema`] when `dtypes` is empty.
    /// - [`IoError::InputDataError`] when the lists differ in length.
    /// - [`IoError::UnsupportedType`] when a type has no wire representation
    ///   (zero-width fixed binary, struct with no children), checked
    ///   recursively.
    pub fn from_parts(
        dtypes: Vec<WireType>,
        names: Vec<String>,
        metadata: Vec<(String, String)>,
    ) -> Result<Self, IoError> {
        if dtypes.is_empty() {
            return Err(IoError::EmptySchema);
        }
        if dtypes.len() != names.len() {
            return Err(IoError::InputDataError(format!(
                "{} column types but {} names",
                dtypes.len(),
                names.len()
            )));
        }
        let fields: Vec<Field> = dtypes
            .into_iter()
            .zip(names)
            .map(|(dtype, name)| Field::new(name, dtype, true))
            .collect();
        for field in &fields {
            validate_field(field)?;
        }
        Ok(Self { fields, metadata })
    }

    /// Build directly from fields, validating each.
    pub fn from_fields(
        fields: Vec<Field>,
        metadata: Vec<(String, String)>,
    ) -> Result<Self, IoError> {
        if fields.is_empty() {
            return Err(IoError::EmptySchema);
        }
        for field in &fields {
            validate_field(field)?;
        }
        Ok(Self { fields, metadata })
    }

    /// Project the schema back into `(types, names)` parts.
    pub fn to_parts(&self) -> (Vec<WireType>, Vec<String>) {
        let types = self.fields.iter().map(|f| f.dtype.clone()).collect();
        let names = self.fields.iter().map(|f| f.name.clone()).collect();
        (types, names)
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }
}

fn validate_field(field: &Field) -> Result<(), IoError> {
    match &field.dtype {
        WireType::FixedBinary(0) => Err(IoError::UnsupportedType(format!(
            "field '{}': fixed binary width must be non-zero",
            field.name
        ))),
        WireType::List(child) => validate_field(child),
        WireType::Struct(children) => {
            if children.is_empty() {
                return Err(IoError::UnsupportedType(format!(
                    "field '{}': struct must have at least one child",
                    field.name
                )));
            }
            for child in children {
                validate_field(child)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_basic() {
        let schema = Schema::from_parts(
            vec![WireType::Int64, WireType::Utf8],
            vec!["id".into(), "name".into()],
            vec![("origin".into(), "unit-test".into())],
        )
        .unwrap();
        assert_eq!(schema.n_fields(), 2);
        assert_eq!(schema.fields[0].name, "id");
        assert!(schema.fields[0].nullable);
        assert_eq!(schema.metadata.len(), 1);
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = Schema::from_parts(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, IoError::EmptySchema));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err =
            Schema::from_parts(vec![WireType::Int32], vec![], vec![]).unwrap_err();
        assert!(matches!(err, IoError::InputDataError(_)));
    }

    #[test]
    fn test_zero_width_fixed_binary_rejected() {
        let err = Schema::from_fields(
            vec![Field::new("raw", WireType::FixedBinary(0), false)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, IoError::UnsupportedType(_)));
    }

    #[test]
    fn test_childless_struct_rejected_recursively() {
        let bad = Field::new(
            "wrapper",
            WireType::List(Box::new(Field::new("inner", WireType::Struct(vec![]), true))),
            true,
        );
        let err = Schema::from_fields(vec![bad], vec![]).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedType(_)));
    }

    #[test]
    fn test_to_parts_roundtrip() {
        let schema = Schema::from_parts(
            vec![WireType::Float64, WireType::Bool],
            vec!["x".into(), "flag".into()],
            vec![],
        )
        .unwrap();
        let (types, names) = schema.to_parts();
        assert_eq!(types, vec![WireType::Float64, WireType::Bool]);
        assert_eq!(names, vec!["x".to_string(), "flag".to_string()]);
    }
}
