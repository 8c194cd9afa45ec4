use crate::error::IoError;
use crate::traits::stream_buffer::StreamBuffer;

/// The outcome of a single frame decoder step.
///
/// Communicates whether a full frame has been detected or whether more bytes
/// are required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeResult<F> {
    /// A complete logical frame was detected.
    ///
    /// - `frame`: The decoded frame of the target type.
    /// - `consumed`: The number of bytes from the buffer that should be discarded.
    Frame { frame: F, consumed: usize },

    /// The decoder requires more bytes to detect a full frame.
    ///
    /// No bytes should be removed from the buffer.
    NeedMore,
}

/// Wire-stream decoding state machine.
///
/// Encodes protocol progress and marker consumption for the framed stream.
#[derive(Debug, Clone)]
pub enum DecodeState<B: StreamBuffer> {
    /// Ready to read the continuation marker and metadata length prefix.
    ReadingMessageLength,

    /// Currently reading a metadata body of the given (padded) length.
    ReadingMessage {
        /// Length of the metadata payload in bytes, padding included.
        msg_len: usize,
    },

    /// Currently reading a record body.
    ReadingBody {
        /// Length of the body in bytes, padding included.
        body_len: usize,
        /// Buffer holding the metadata already assembled.
        message: B,
    },

    /// End-of-stream marker consumed; no further frames follow.
    Done,
}

/// Specifies chunk sizing strategies for `DiskByteSource` and other sources.
///
/// Provides domain-appropriate defaults but allows override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferChunkSize {
    /// File I/O: Default is 1 MiB chunks.
    FileIO,

    /// In-memory streams: Default is 512 KiB.
    InMemory,

    /// Custom chunk size.
    Custom(usize),
}

impl BufferChunkSize {
    /// Returns the configured chunk size in bytes.
    pub fn chunk_size(self) -> usize {
        match self {
            BufferChunkSize::FileIO => 1024 * 1024,  // 1 MiB
            BufferChunkSize::InMemory => 512 * 1024, // 512 KiB
            BufferChunkSize::Custom(n) => n,
        }
    }
}

/// Wire message kinds.
///
/// The kind byte is the first byte of every metadata body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind {
    /// Schema definition message.
    Schema,

    /// Record batch payload.
    RecordBatch,
}

impl MessageKind {
    pub fn to_u8(self) -> u8 {
        match self {
            MessageKind::Schema => 0,
            MessageKind::RecordBatch => 1,
        }
    }

    pub fn from_u8(v: u8) -> Result<Self, IoError> {
        match v {
            0 => Ok(MessageKind::Schema),
            1 => Ok(MessageKind::RecordBatch),
            other => Err(IoError::MalformedStream(format!(
                "unknown message kind {other}"
            ))),
        }
    }
}

/// State machine for stream message batching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchState {
    /// Schema has not yet been received.
    NeedSchema,

    /// Ready to emit batches.
    Ready,

    /// End of stream reached.
    Done,
}

/// State machine for stream writers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriterState {
    /// Fresh writer, no schema written yet.
    Fresh,

    /// Schema has been written, can emit batches.
    SchemaDone,

    /// Writer closed, no further messages may be written.
    Closed,
}
