//! Blocking byte-stream adapter traits.
//!
//! The boundary between the codec and the host's byte-stream primitives.
//! Writers push encoded frames through a [`ByteSink`]; decoders pull chunks
//! from a [`ByteSource`]. Both are blocking: every call completes or fails
//! before returning, and cancellation is expressed by closing the handle.
//!
//! Handles are scoped: acquired at construction, released exactly once via
//! `close()` (or drop), on every exit path.

use crate::error::IoError;

/// A blocking source of bytes (file handle, socket, in-memory cursor).
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning the number read.
    /// A return of `0` signals the end of the underlying stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Release the underlying resource. Subsequent reads return `0`.
    /// Idempotent: closing an already-closed source is a no-op.
    fn close(&mut self) -> Result<(), IoError>;
}

/// A blocking sink for bytes (file handle, socket, in-memory buffer).
pub trait ByteSink {
    /// Write all of `bytes`, or fail.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError>;

    /// Total bytes written through this sink so far.
    fn bytes_written(&self) -> u64;

    /// Flush and release the underlying resource. Writes after `close()`
    /// fail. Idempotent: closing an already-closed sink is a no-op.
    fn close(&mut self) -> Result<(), IoError>;
}

/// In-memory sink, primarily for tests and pre-serialisation staging.
impl ByteSink for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.len() as u64
    }

    fn close(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
