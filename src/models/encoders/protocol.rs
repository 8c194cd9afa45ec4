//! Wire frame encoder.
//!
//! Assembles one logical message into its on-the-wire frame:
//!
//! ```text
//! <continuation: 0xFFFFFFFF>
//! <metadata_size: int32>       (padded size; prefix + metadata end aligned)
//! <metadata body bytes>
//! <padding>
//! <message body>
//! ```
//!
//! The end-of-stream marker is the continuation sentinel followed by a zero
//! length field, with no body. Every emitted frame is a whole number of
//! `B::ALIGN` bytes, so stream-global alignment holds by induction and no
//! running offset needs to be threaded through encoders that pre-serialise
//! off-band.

use crate::constants::{
    CONTINUATION_MARKER_LEN, CONTINUATION_SENTINEL, DEFAULT_FRAME_ALLOCATION_SIZE, EOS_MARKER_LEN,
    METADATA_SIZE_PREFIX,
};
use crate::error::IoError;
use crate::models::frames::wire_message::FrameMetadata;
use crate::traits::frame_encoder::FrameEncoder;
use crate::traits::stream_buffer::StreamBuffer;
use crate::utils::align_to;

/// Borrowed view of one message to be framed.
///
/// `is_last` appends the end-of-stream marker after the message (or emits
/// only the marker when `meta` and `body` are empty).
pub struct WireFrame<'a> {
    pub meta: &'a [u8],
    pub body: &'a [u8],
    pub is_last: bool,
}

/// Encodes a metadata+body pair as a valid wire frame.
pub struct WireFrameEncoder;

impl FrameEncoder for WireFrameEncoder {
    type Frame<'a> = WireFrame<'a>;
    type Metadata = FrameMetadata;

    fn encode<'a, B: StreamBuffer>(
        frame: &Self::Frame<'a>,
    ) -> Result<(B, Self::Metadata), IoError> {
        let mut out = B::with_capacity(DEFAULT_FRAME_ALLOCATION_SIZE);
        let mut frame_meta = FrameMetadata::default();

        // An EOS-only frame carries no message.
        let write_msg_frame = !frame.meta.is_empty() || !frame.body.is_empty();
        if write_msg_frame {
            Self::append_message_frame(&mut out, frame.meta, frame.body, &mut frame_meta)?;
        }

        if frame.is_last {
            Self::append_eos_marker(&mut out, &mut frame_meta);
        }
        Ok((out, frame_meta))
    }
}

impl WireFrameEncoder {
    /// Append the end-of-stream marker: 0xFFFFFFFF followed by 0x00000000.
    fn append_eos_marker<B: StreamBuffer>(out: &mut B, frame_meta: &mut FrameMetadata) {
        out.extend_from_slice(&CONTINUATION_SENTINEL.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // Zero metadata length
        frame_meta.eos_len = EOS_MARKER_LEN;
    }

    /// Append a single message frame to `out`.
    fn append_message_frame<B: StreamBuffer>(
        out: &mut B,
        meta: &[u8],
        body: &[u8],
        frame_meta: &mut FrameMetadata,
    ) -> Result<(), IoError> {
        if meta.is_empty() {
            return Err(IoError::InputDataError(
                "message body without metadata".to_string(),
            ));
        }
        // The body arrives with its buffers already padded; a misaligned body
        // would desynchronise every subsequent frame boundary.
        if body.len() % B::ALIGN != 0 {
            return Err(IoError::InputDataError(format!(
                "message body length {} is not a multiple of the {}-byte alignment",
                body.len(),
                B::ALIGN
            )));
        }

        frame_meta.header_len = CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX;
        frame_meta.meta_len = meta.len();
        // Pad so the header plus metadata section ends on the alignment
        // boundary; the body then starts aligned.
        frame_meta.meta_pad = align_to::<B>(frame_meta.header_len + meta.len());
        frame_meta.body_len = body.len();
        frame_meta.body_pad = 0;

        let padded_meta = frame_meta.meta_len + frame_meta.meta_pad;
        if padded_meta > i32::MAX as usize {
            return Err(IoError::InputDataError(format!(
                "metadata section of {} bytes exceeds the 31-bit length prefix",
                padded_meta
            )));
        }

        out.reserve(frame_meta.frame_len());

        // Continuation marker (sentinel) - 4 bytes
        out.extend_from_slice(&CONTINUATION_SENTINEL.to_le_bytes());

        // Metadata size (padded) - 4 bytes
        out.extend_from_slice(&(padded_meta as i32).to_le_bytes());

        // Message metadata + padding
        out.extend_from_slice(meta);
        if frame_meta.meta_pad != 0 {
            out.extend_from_slice(&vec![0u8; frame_meta.meta_pad]);
        }

        // Message body (buffers pre-padded by the batch encoder)
        out.extend_from_slice(body);
        Ok(())
    }
}
