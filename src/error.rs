//! # Codec Errors
//!
//! Unified error type for all writer/decoder operations in Colstream.
//!
//! Covers I/O failures, schema violations, malformed streams, compression
//! errors, and lifecycle misuse. Conversion impls are provided for common
//! error sources so that encoders/decoders can propagate errors directly.
//! Errors are surfaced to the caller as-is; nothing here retries or
//! downgrades a failure.

use std::string::FromUtf8Error;
use std::{error, fmt, io};

/// Unified error type for all codec operations.
#[derive(Debug)]
pub enum IoError {
    /// Underlying I/O failure (read error, write error, file system error).
    Io(io::Error),

    /// Destination already exists and exclusive create was requested.
    DestinationExists(String),

    /// Schema resolved to zero columns.
    EmptySchema,

    /// A logical type has no wire representation.
    UnsupportedType(String),

    /// Malformed or invalid input data (shape mismatch, bounds error, etc.).
    InputDataError(String),

    /// Byte stream violates the wire protocol: missing continuation marker,
    /// declared lengths overrunning the available bytes, unparseable header.
    MalformedStream(String),

    /// Compression codec error, carrying the codec's diagnostic message.
    Compression(String),

    /// Decompression produced a byte count different from the declared
    /// uncompressed size.
    SizeMismatch { expected: usize, actual: usize },

    /// Operation violates the stream lifecycle (write after finish, schema
    /// written twice, etc.).
    Lifecycle(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "I/O error: {}", e),
            IoError::DestinationExists(s) => write!(f, "Destination already exists: {}", s),
            IoError::EmptySchema => write!(f, "Schema must have at least one column"),
            IoError::UnsupportedType(s) => write!(f, "Unsupported type: {}", s),
            IoError::InputDataError(s) => write!(f, "Data error: {}", s),
            IoError::MalformedStream(s) => write!(f, "Malformed stream: {}", s),
            IoError::Compression(s) => write!(f, "Compression error: {}", s),
            IoError::SizeMismatch { expected, actual } => write!(
                f,
                "Decompressed size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            IoError::Lifecycle(s) => write!(f, "Lifecycle error: {}", s),
        }
    }
}

impl error::Error for IoError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            IoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

// Conversions for error handling

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        IoError::Io(e)
    }
}

impl From<FromUtf8Error> for IoError {
    fn from(e: FromUtf8Error) -> Self {
        IoError::MalformedStream(format!("invalid UTF-8 in metadata: {}", e))
    }
}

// Zstd error handling is done manually in the compression.rs file

#[cfg(feature = "snappy")]
impl From<snap::Error> for IoError {
    fn from(e: snap::Error) -> Self {
        IoError::Compression(format!("Snappy: {e}"))
    }
}
