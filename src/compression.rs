//! Compression utilities for the record-batch body buffers.
//! - Zstd via the zstd crate when the feature is enabled (the default).
//! - Snappy via the snap crate when the feature is enabled.
//!
//! Decompression is routed through a [`DecompressorRegistry`]: an explicit
//! mapping from codec id to decompression function, injected into the decoder
//! at construction rather than looked up from ambient state. The registry
//! owns its functions outright, so there is no release hook to manage and no
//! double-free hazard in the decompressor's lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::IoError;

/// Supported body-buffer compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    #[cfg(feature = "zstd")]
    Zstd,
    #[cfg(feature = "snappy")]
    Snappy,
}

// Wire identifiers. Ids of codecs compiled out remain reserved: a stream
// declaring them decodes only with a matching decompressor registered.
const CODEC_ID_NONE: u8 = 0;
const CODEC_ID_ZSTD: u8 = 1;
const CODEC_ID_SNAPPY: u8 = 2;

impl Compression {
    /// Wire identifier recorded in record-batch metadata.
    pub fn id(self) -> u8 {
        match self {
            Compression::None => CODEC_ID_NONE,
            #[cfg(feature = "zstd")]
            Compression::Zstd => CODEC_ID_ZSTD,
            #[cfg(feature = "snappy")]
            Compression::Snappy => CODEC_ID_SNAPPY,
        }
    }

    /// Human-readable codec name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            #[cfg(feature = "zstd")]
            Compression::Zstd => "zstd",
            #[cfg(feature = "snappy")]
            Compression::Snappy => "snappy",
        }
    }
}

/// Compress a buffer according to the requested codec.
/// Always returns a new Vec<u8>.
///
/// # Arguments
/// - `input`: Slice of bytes to compress.
/// - `codec`: Compression algorithm to apply.
///
/// # Errors
/// Returns [`IoError::Compression`] if the codec fails.
pub fn compress(input: &[u8], codec: Compression) -> Result<Vec<u8>, IoError> {
    match codec {
        Compression::None => Ok(input.to_vec()),
        #[cfg(feature = "zstd")]
        Compression::Zstd => zstd_compress(input),
        #[cfg(feature = "snappy")]
        Compression::Snappy => snappy_compress(input),
    }
}

/// Zstd compression using the zstd crate.
#[cfg(feature = "zstd")]
fn zstd_compress(input: &[u8]) -> Result<Vec<u8>, IoError> {
    // Level 1 is fastest, with good compression.
    zstd::stream::encode_all(input, 1)
        .map_err(|e| IoError::Compression(format!("Zstd compression failed: {e}")))
}

/// Snappy compression using the snap crate.
#[cfg(feature = "snappy")]
fn snappy_compress(input: &[u8]) -> Result<Vec<u8>, IoError> {
    let mut encoder = snap::raw::Encoder::new();
    Ok(encoder.compress_vec(input)?)
}

#[cfg(feature = "zstd")]
fn zstd_decompress(input: &[u8], _expected: usize) -> Result<Vec<u8>, IoError> {
    zstd::stream::decode_all(input)
        .map_err(|e| IoError::Compression(format!("Zstd decompression failed: {e}")))
}

#[cfg(feature = "snappy")]
fn snappy_decompress(input: &[u8], _expected: usize) -> Result<Vec<u8>, IoError> {
    let mut decoder = snap::raw::Decoder::new();
    Ok(decoder.decompress_vec(input)?)
}

/// A replaceable decompression function: `(compressed bytes, expected
/// uncompressed size) → decompressed bytes`.
///
/// Implementations report codec failures as [`IoError::Compression`]. They
/// may use the expected size as an allocation hint but are not required to
/// enforce it; the registry checks the output size after every call.
pub type DecompressFn = Arc<dyn Fn(&[u8], usize) -> Result<Vec<u8>, IoError> + Send + Sync>;

/// Explicit codec-id → decompressor mapping, injected into the decoder.
///
/// The registry is configuration, not shared mutable state: once built it is
/// only read, and a decode path calls it serially.
#[derive(Clone)]
pub struct DecompressorRegistry {
    map: HashMap<u8, DecompressFn>,
}

impl DecompressorRegistry {
    /// A registry with no codecs. Streams declaring any compression fail to
    /// decode until a matching decompressor is registered.
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    /// A registry with the feature-enabled built-in codecs registered.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut reg = Self::empty();
        #[cfg(feature = "zstd")]
        reg.register(CODEC_ID_ZSTD, Arc::new(zstd_decompress));
        #[cfg(feature = "snappy")]
        reg.register(CODEC_ID_SNAPPY, Arc::new(snappy_decompress));
        reg
    }

    /// Register or replace the decompressor for a codec id.
    pub fn register(&mut self, codec_id: u8, f: DecompressFn) {
        self.map.insert(codec_id, f);
    }

    /// Whether a decompressor is registered for `codec_id`.
    pub fn contains(&self, codec_id: u8) -> bool {
        self.map.contains_key(&codec_id)
    }

    /// Decompress `input`, expecting exactly `expected` output bytes.
    ///
    /// # Errors
    /// - [`IoError::Compression`] if no decompressor is registered for
    ///   `codec_id`, or the codec itself reports a failure.
    /// - [`IoError::SizeMismatch`] if the codec succeeds but produces a byte
    ///   count different from `expected`.
    pub fn decompress(&self, codec_id: u8, input: &[u8], expected: usize) -> Result<Vec<u8>, IoError> {
        let f = self.map.get(&codec_id).ok_or_else(|| {
            IoError::Compression(format!("no decompressor registered for codec id {codec_id}"))
        })?;
        let out = f(input, expected)?;
        if out.len() != expected {
            return Err(IoError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

impl Default for DecompressorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_roundtrip() {
        let data = b"hello columnar world".to_vec();
        let out = compress(&data, Compression::None).unwrap();
        assert_eq!(out, data);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_roundtrip_via_registry() {
        let data: Vec<u8> = (0..4096u32).flat_map(|i| (i % 97).to_le_bytes()).collect();
        let compressed = compress(&data, Compression::Zstd).unwrap();
        assert!(compressed.len() < data.len());
        let reg = DecompressorRegistry::with_builtins();
        let out = reg
            .decompress(Compression::Zstd.id(), &compressed, data.len())
            .unwrap();
        assert_eq!(out, data);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_size_mismatch_is_detected() {
        let data = vec![7u8; 512];
        let compressed = compress(&data, Compression::Zstd).unwrap();
        let reg = DecompressorRegistry::with_builtins();
        let err = reg
            .decompress(Compression::Zstd.id(), &compressed, data.len() + 1)
            .unwrap_err();
        match err {
            IoError::SizeMismatch { expected, actual } => {
                assert_eq!(expected, 513);
                assert_eq!(actual, 512);
            }
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unregistered_codec_is_an_error() {
        let reg = DecompressorRegistry::empty();
        let err = reg.decompress(1, &[0u8; 4], 16).unwrap_err();
        assert!(matches!(err, IoError::Compression(_)));
    }

    #[test]
    fn test_custom_decompressor_wins() {
        let mut reg = DecompressorRegistry::empty();
        reg.register(9, Arc::new(|input, _| Ok(input.iter().rev().copied().collect())));
        let out = reg.decompress(9, &[1, 2, 3], 3).unwrap();
        assert_eq!(out, vec![3, 2, 1]);
    }
}
