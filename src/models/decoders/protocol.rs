//! Wire frame decoder.
//!
//! Detects message boundaries in the framed byte stream, as a state machine
//! consuming input buffers and producing [`WireMessage`] instances as
//! complete frames are detected. Partial input is handled by returning
//! [`DecodeResult::NeedMore`] without consuming bytes, so callers can feed
//! chunks of any size.
//!
//! Every message frame must open with the continuation sentinel; a missing
//! marker is a protocol violation, not a legacy framing variant. A zero
//! metadata length after the sentinel is the end-of-stream marker and is
//! surfaced as an empty [`WireMessage`].

use std::marker::PhantomData;

use crate::constants::{
    CONTINUATION_MARKER_LEN, CONTINUATION_SENTINEL, EOS_MARKER_LEN, METADATA_HEADER_LEN,
    METADATA_SIZE_PREFIX,
};
use crate::enums::{DecodeResult, DecodeState};
use crate::error::IoError;
use crate::models::frames::wire_message::WireMessage;
use crate::traits::frame_decoder::FrameDecoder;
use crate::traits::stream_buffer::StreamBuffer;

/// Decoder for the wire frame state machine.
pub struct WireFrameDecoder<B: StreamBuffer> {
    state: DecodeState<B>,
    _phantom: PhantomData<B>,
}

impl<B: StreamBuffer> FrameDecoder for WireFrameDecoder<B> {
    type Frame = WireMessage<B>;

    fn decode(&mut self, buf: &[u8]) -> Result<DecodeResult<Self::Frame>, IoError> {
        loop {
            let state = std::mem::replace(&mut self.state, DecodeState::ReadingMessageLength);
            let step = match state {
                DecodeState::ReadingMessageLength => self.decode_message_length(buf)?,
                DecodeState::ReadingMessage { msg_len } => self.decode_message(buf, msg_len)?,
                DecodeState::ReadingBody { body_len, message } => {
                    self.decode_body(buf, body_len, message)?
                }
                DecodeState::Done => {
                    self.state = DecodeState::Done;
                    Some(DecodeResult::NeedMore)
                }
            };

            if let Some(done) = step {
                return Ok(done);
            }
            // otherwise loop and continue progressing within the same input slice
        }
    }
}

impl<B: StreamBuffer> WireFrameDecoder<B> {
    pub fn new() -> Self {
        Self {
            state: DecodeState::ReadingMessageLength,
            _phantom: PhantomData,
        }
    }

    /// True once the end-of-stream marker has been consumed.
    pub fn is_done(&self) -> bool {
        matches!(self.state, DecodeState::Done)
    }

    #[inline]
    fn read_u32_le(buf: &[u8]) -> u32 {
        u32::from_le_bytes(buf[..4].try_into().unwrap())
    }

    /// Parse the continuation marker and metadata length prefix.
    fn decode_message_length(
        &mut self,
        buf: &[u8],
    ) -> Result<Option<DecodeResult<WireMessage<B>>>, IoError> {
        if buf.len() < CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX {
            self.state = DecodeState::ReadingMessageLength;
            return Ok(Some(DecodeResult::NeedMore));
        }

        if Self::read_u32_le(buf) != CONTINUATION_SENTINEL {
            return Err(IoError::MalformedStream(format!(
                "continuation marker missing: got {:#010x}",
                Self::read_u32_le(buf)
            )));
        }

        let msg_len = i32::from_le_bytes(
            buf[CONTINUATION_MARKER_LEN..CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX]
                .try_into()
                .unwrap(),
        );

        // Zero length after the sentinel is the end-of-stream marker.
        if msg_len == 0 {
            self.state = DecodeState::Done;
            return Ok(Some(DecodeResult::Frame {
                frame: WireMessage {
                    message: B::default(),
                    body: B::default(),
                },
                consumed: EOS_MARKER_LEN,
            }));
        }
        if msg_len < 0 {
            return Err(IoError::MalformedStream(format!(
                "negative metadata length {msg_len}"
            )));
        }

        self.state = DecodeState::ReadingMessage {
            msg_len: msg_len as usize,
        };
        Ok(None)
    }

    /// Read the metadata section, learn the body length from its fixed
    /// prefix, and (if present) read the body in the same pass.
    fn decode_message(
        &mut self,
        buf: &[u8],
        msg_len: usize,
    ) -> Result<Option<DecodeResult<WireMessage<B>>>, IoError> {
        let meta_start = CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX;
        let meta_end = meta_start + msg_len;

        if buf.len() < meta_end {
            self.state = DecodeState::ReadingMessage { msg_len };
            return Ok(Some(DecodeResult::NeedMore));
        }

        if msg_len < METADATA_HEADER_LEN {
            return Err(IoError::MalformedStream(format!(
                "metadata section of {msg_len} bytes is shorter than the {METADATA_HEADER_LEN}-byte header"
            )));
        }

        let message = B::from_slice(&buf[meta_start..meta_end]);
        // Body length lives at the fixed offset after the kind byte.
        let body_len =
            u64::from_le_bytes(buf[meta_start + 1..meta_start + 9].try_into().unwrap()) as usize;

        if body_len == 0 {
            self.state = DecodeState::ReadingMessageLength;
            return Ok(Some(DecodeResult::Frame {
                frame: WireMessage {
                    message,
                    body: B::default(),
                },
                consumed: meta_end,
            }));
        }

        let body_end = meta_end + body_len;
        if buf.len() < body_end {
            // Need more to finish the body later; keep the message around.
            self.state = DecodeState::ReadingBody { body_len, message };
            return Ok(Some(DecodeResult::NeedMore));
        }

        let body = B::from_slice(&buf[meta_end..body_end]);
        self.state = DecodeState::ReadingMessageLength;
        Ok(Some(DecodeResult::Frame {
            frame: WireMessage { message, body },
            consumed: body_end,
        }))
    }

    /// Continue reading the body if `decode_message` determined it wasn't
    /// fully available yet.
    fn decode_body(
        &mut self,
        buf: &[u8],
        body_len: usize,
        message: B,
    ) -> Result<Option<DecodeResult<WireMessage<B>>>, IoError> {
        let meta_end = CONTINUATION_MARKER_LEN + METADATA_SIZE_PREFIX + message.len();
        let body_end = meta_end + body_len;

        if buf.len() < body_end {
            self.state = DecodeState::ReadingBody { body_len, message };
            return Ok(Some(DecodeResult::NeedMore));
        }

        let body = B::from_slice(&buf[meta_end..body_end]);
        self.state = DecodeState::ReadingMessageLength;
        Ok(Some(DecodeResult::Frame {
            frame: WireMessage { message, body },
            consumed: body_end,
        }))
    }
}

impl<B: StreamBuffer> Default for WireFrameDecoder<B> {
    fn default() -> Self {
        WireFrameDecoder::new()
    }
}
