//! # Generic Frame Encoder
//!
//! Serialise your protocol frames into **on-the-wire bytes** efficiently.
//!
//! **Why this is useful**
//! - Central place to define how a frame becomes a byte sequence.
//! - Keeps responsibility for buffer management with the caller.
//! - Plays nicely with any sink (files, sockets, custom transports).
//!
//! Implement `FrameEncoder` for your format; call `encode()` to obtain the
//! wire bytes for a frame.

use crate::error::IoError;
use crate::traits::stream_buffer::StreamBuffer;

/// Implement this trait for any wire format requiring message serialisation.
///
/// ### Safety Contract
/// - The encoder must not mutate the frame being encoded.
/// - The encoder must not retain references to input data after the call.
/// - All writes must be bounded to the returned buffer.
pub trait FrameEncoder {
    /// The type of frame accepted by this encoder.
    type Frame<'a>;

    /// The type of metadata produced by this encoder.
    type Metadata;

    /// Encode a frame, producing both an output buffer and frame metadata.
    ///
    /// Returns an owned buffer containing the encoded frame and the
    /// associated length accounting. Returns `Err` if encoding fails.
    ///
    /// Every returned buffer is a whole number of `B::ALIGN` bytes, so
    /// concatenating frames preserves stream-global alignment without the
    /// encoder knowing its final offset in the stream.
    fn encode<'a, B: StreamBuffer>(frame: &Self::Frame<'a>) -> Result<(B, Self::Metadata), IoError>;
}
