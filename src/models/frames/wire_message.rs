//! # Wire Frame Structures
//!
//! Core data structures for frame encoding.
//!
//! - [`WireMessage`] wraps a metadata body and its associated data body.
//! - [`FrameMetadata`] tracks byte lengths and padding for all frame
//!   sections, used to compute total frame size and to enforce the wire
//!   format's alignment rules.
//!
//! These are internal, low-level components used by the frame encoders and
//! the stream writer/decoder.

use crate::traits::stream_buffer::StreamBuffer;

/// One decoded (or to-be-encoded) wire message.
///
/// Wraps the metadata body (message kind, schema or batch descriptors) and
/// the corresponding data body (concatenated column buffers). An empty
/// message with an empty body represents the end-of-stream marker.
#[derive(Debug)]
pub struct WireMessage<B: StreamBuffer> {
    /// Metadata body bytes, padding included.
    pub message: B,
    /// Columnar data buffer payload, padding included.
    pub body: B,
}

impl<B: StreamBuffer> WireMessage<B> {
    /// True when this message is the end-of-stream marker.
    pub fn is_eos(&self) -> bool {
        self.message.is_empty() && self.body.is_empty()
    }
}

/// Row-count and null-count descriptor for one field (or nested child
/// field) of a record-batch message. Emitted in preorder, one per field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldNode {
    pub length: i64,
    pub null_count: i64,
}

/// Location and size descriptor for one physical buffer of a record-batch
/// message. `offset` is relative to the body start; `disk_len` counts the
/// bytes present in the body (compressed when `compressed` is set), and
/// `raw_len` the uncompressed byte count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferDescriptor {
    pub offset: u64,
    pub disk_len: u64,
    pub raw_len: u64,
    pub compressed: bool,
}

impl BufferDescriptor {
    /// Zero-length placeholder, used for absent validity buffers.
    pub fn absent() -> Self {
        Self {
            offset: 0,
            disk_len: 0,
            raw_len: 0,
            compressed: false,
        }
    }
}

/// Per-frame accounting metadata for wire encoding.
///
/// Tracks lengths of all logical sections of an encoded frame
/// (header, metadata, body, EOS marker) including any padding.
#[derive(Debug, Default)]
pub struct FrameMetadata {
    /// Header size in bytes - continuation marker + metadata size prefix
    pub header_len: usize,
    /// Raw metadata length in bytes (excluding padding)
    pub meta_len: usize,
    /// Padding applied after metadata for alignment.
    pub meta_pad: usize,
    /// Raw body length in bytes (excluding padding)
    pub body_len: usize,
    /// Padding applied after body for alignment
    pub body_pad: usize,
    /// End-of-stream marker length in bytes, if present
    pub eos_len: usize,
}

impl FrameMetadata {
    /// Return total encoded frame length.
    pub fn frame_len(&self) -> usize {
        self.header_len + self.metadata_total_len() + self.body_total_len() + self.eos_len
    }

    /// Return total metadata section length including padding.
    pub fn metadata_total_len(&self) -> usize {
        self.meta_len + self.meta_pad
    }

    /// Return total body length including padding.
    pub fn body_total_len(&self) -> usize {
        self.body_len + self.body_pad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_metadata_calculations() {
        let metadata = FrameMetadata {
            header_len: 8,
            meta_len: 120,
            meta_pad: 8,
            body_len: 16,
            body_pad: 0,
            eos_len: 0,
        };
        assert_eq!(metadata.metadata_total_len(), 128);
        assert_eq!(metadata.body_total_len(), 16);
        assert_eq!(metadata.frame_len(), 152);
    }

    #[test]
    fn test_eos_detection() {
        let eos: WireMessage<Vec<u8>> = WireMessage {
            message: Vec::new(),
            body: Vec::new(),
        };
        assert!(eos.is_eos());

        let msg: WireMessage<Vec<u8>> = WireMessage {
            message: vec![1u8; 9],
            body: Vec::new(),
        };
        assert!(!msg.is_eos());
    }
}
