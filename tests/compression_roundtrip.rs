//! Compression round-trip tests.
//!
//! Verify that compressed streams decode with full data integrity, that the
//! per-buffer stored-raw fallback round-trips, and that the two
//! decompression failure modes (codec error, size mismatch) surface as
//! distinct errors rather than silent truncation.

use std::sync::Arc;

use tempfile::tempdir;

use colstream::{
    Batch, Bitmask, Column, ColumnData, Compression, DecompressorRegistry, Field, IoError,
    Schema, StreamReader, StreamWriter, WireType,
};

fn compressible_schema() -> Schema {
    Schema::from_fields(
        vec![
            Field::new("repeated", WireType::Int64, false),
            Field::new("text", WireType::Utf8, true),
        ],
        vec![],
    )
    .unwrap()
}

/// Repetitive payloads so every codec actually shrinks the buffers.
fn compressible_batch(n_rows: usize) -> Batch {
    let repeated: Vec<i64> = (0..n_rows).map(|i| (i % 16) as i64).collect();
    let mut offsets = vec![0i32];
    let mut data = Vec::new();
    for i in 0..n_rows {
        let value = format!("row-{:03}", i % 10);
        data.extend_from_slice(value.as_bytes());
        offsets.push(data.len() as i32);
    }
    Batch::new(
        n_rows,
        vec![
            Column::new(ColumnData::Int64(repeated), None),
            Column::new(
                ColumnData::Utf8 { offsets, data },
                Some(Bitmask::from_bools(
                    &(0..n_rows).map(|i| i % 7 != 0).collect::<Vec<_>>(),
                )),
            ),
        ],
    )
}

fn write_and_read(codec: Compression, registry: DecompressorRegistry) -> (Vec<Batch>, Vec<Batch>) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("compressed.cols");

    let originals = vec![compressible_batch(1000), compressible_batch(257)];

    let mut writer = StreamWriter::create(&path, compressible_schema(), codec).unwrap();
    for original in &originals {
        let mut batch = original.clone();
        writer.write_batch(&mut batch).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = StreamReader::open(&path, registry).unwrap();
    let decoded = reader.read_all().unwrap();
    (originals, decoded)
}

#[test]
fn none_roundtrip() {
    let (originals, decoded) = write_and_read(
        Compression::None,
        DecompressorRegistry::with_builtins(),
    );
    assert_eq!(decoded, originals);
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_roundtrip() {
    let (originals, decoded) = write_and_read(
        Compression::Zstd,
        DecompressorRegistry::with_builtins(),
    );
    assert_eq!(decoded, originals);
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_shrinks_the_destination() {
    let dir = tempdir().unwrap();
    let plain_path = dir.path().join("plain.cols");
    let packed_path = dir.path().join("packed.cols");

    for (path, codec) in [
        (&plain_path, Compression::None),
        (&packed_path, Compression::Zstd),
    ] {
        let mut writer =
            StreamWriter::create(path, compressible_schema(), codec).unwrap();
        let mut batch = compressible_batch(4096);
        writer.write_batch(&mut batch).unwrap();
        writer.finish().unwrap();
    }

    let plain = std::fs::metadata(&plain_path).unwrap().len();
    let packed = std::fs::metadata(&packed_path).unwrap().len();
    assert!(
        packed < plain,
        "compressed stream ({packed}) should be smaller than raw ({plain})"
    );
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_roundtrip() {
    let (originals, decoded) = write_and_read(
        Compression::Snappy,
        DecompressorRegistry::with_builtins(),
    );
    assert_eq!(decoded, originals);
}

#[cfg(feature = "zstd")]
#[test]
fn incompressible_buffers_are_stored_raw_and_roundtrip() {
    // A tiny batch: codec framing overhead exceeds any gain, so buffers take
    // the stored-raw path while the message still declares the codec.
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.cols");

    let schema = Schema::from_fields(
        vec![Field::new("v", WireType::Int32, false)],
        vec![],
    )
    .unwrap();
    let original = Batch::new(
        2,
        vec![Column::new(ColumnData::Int32(vec![-7, 2096]), None)],
    );

    let mut writer = StreamWriter::create(&path, schema, Compression::Zstd).unwrap();
    let mut batch = original.clone();
    writer.write_batch(&mut batch).unwrap();
    writer.finish().unwrap();

    let mut reader = StreamReader::open(&path, DecompressorRegistry::with_builtins()).unwrap();
    let decoded = reader.read_all().unwrap();
    assert_eq!(decoded, vec![original]);
}

#[cfg(feature = "zstd")]
#[test]
fn declared_compression_without_registered_codec_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orphan.cols");

    let mut writer =
        StreamWriter::create(&path, compressible_schema(), Compression::Zstd).unwrap();
    let mut batch = compressible_batch(512);
    writer.write_batch(&mut batch).unwrap();
    writer.finish().unwrap();

    // An empty registry cannot satisfy the declared codec.
    let mut reader = StreamReader::open(&path, DecompressorRegistry::empty()).unwrap();
    let err = reader.next_batch().unwrap_err();
    assert!(matches!(err, IoError::Compression(_)));
}

#[cfg(feature = "zstd")]
#[test]
fn size_mismatch_is_an_error_not_a_truncation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lying.cols");

    let mut writer =
        StreamWriter::create(&path, compressible_schema(), Compression::Zstd).unwrap();
    let mut batch = compressible_batch(512);
    writer.write_batch(&mut batch).unwrap();
    writer.finish().unwrap();

    // Wrap the real zstd decompressor with one that drops the last byte:
    // the codec "succeeds" but the output size no longer matches the
    // declared uncompressed length.
    let mut registry = DecompressorRegistry::empty();
    registry.register(
        Compression::Zstd.id(),
        Arc::new(|input: &[u8], _expected: usize| {
            let mut out = zstd::stream::decode_all(input)
                .map_err(|e| IoError::Compression(e.to_string()))?;
            out.pop();
            Ok(out)
        }),
    );

    let mut reader = StreamReader::open(&path, registry).unwrap();
    let err = reader.next_batch().unwrap_err();
    match err {
        IoError::SizeMismatch { expected, actual } => {
            assert_eq!(actual + 1, expected);
        }
        other => panic!("expected SizeMismatch, got {other:?}"),
    }
}

#[cfg(feature = "zstd")]
#[test]
fn corrupt_payload_is_a_codec_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.cols");

    let mut writer =
        StreamWriter::create(&path, compressible_schema(), Compression::Zstd).unwrap();
    let mut batch = compressible_batch(512);
    writer.write_batch(&mut batch).unwrap();
    writer.finish().unwrap();

    // Flip bytes in the middle of the record-batch body.
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    for b in &mut bytes[mid..mid + 16] {
        *b ^= 0xFF;
    }
    let corrupt = dir.path().join("flipped.cols");
    std::fs::write(&corrupt, &bytes).unwrap();

    let mut reader = StreamReader::open(&corrupt, DecompressorRegistry::with_builtins()).unwrap();
    let err = reader.next_batch().unwrap_err();
    // Corruption may land in codec framing or in declared lengths; either
    // way it must surface as an error, never as silently wrong data.
    assert!(matches!(
        err,
        IoError::Compression(_) | IoError::SizeMismatch { .. } | IoError::MalformedStream(_)
    ));
}
