//! # Blocking disk byte streams
//!
//! File-backed implementations of the [`ByteSource`] / [`ByteSink`] adapter
//! traits.
//!
//! ## Overview
//! - `DiskByteSource` reads a file in fixed-size chunks via `BufReader`.
//! - `DiskByteSink` opens its destination create-exclusive and counts every
//!   byte written, so the owning writer can report the exact file size.
//! - Handles are scoped: taken at construction, released exactly once by
//!   `close()` (or drop), on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::enums::BufferChunkSize;
use crate::error::IoError;
use crate::traits::byte_stream::{ByteSink, ByteSource};

/// A blocking `ByteSource` that reads a file in fixed-size byte chunks.
pub struct DiskByteSource {
    /// Buffered reader over the file; `None` once closed.
    reader: Option<BufReader<File>>,
}

impl DiskByteSource {
    /// Open a file for reading.
    ///
    /// ### Parameters:
    /// - `path`: Path to the file.
    /// - `size`: Chunk size strategy (`BufferChunkSize`), used for the
    ///   reader's internal buffer capacity.
    ///
    /// ### Returns:
    /// - `Ok(DiskByteSource)` if successful.
    /// - `Err(IoError::Io)` on file open failure.
    pub fn open(path: impl AsRef<Path>, size: BufferChunkSize) -> Result<Self, IoError> {
        let file = File::open(path)?;
        Ok(Self {
            reader: Some(BufReader::with_capacity(size.chunk_size(), file)),
        })
    }
}

impl ByteSource for DiskByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        match self.reader.as_mut() {
            Some(reader) => Ok(reader.read(buf)?),
            None => Ok(0), // closed source reads as EOF
        }
    }

    fn close(&mut self) -> Result<(), IoError> {
        // Dropping the reader closes the handle; idempotent by take().
        self.reader.take();
        Ok(())
    }
}

/// A blocking `ByteSink` over a file opened for exclusive create.
#[derive(Debug)]
pub struct DiskByteSink {
    /// Destination handle; `None` once closed.
    file: Option<File>,
    /// Total bytes written through this sink.
    written: u64,
}

impl DiskByteSink {
    /// Create the destination file, failing if it already exists.
    ///
    /// ### Errors
    /// - [`IoError::DestinationExists`] when the path is already present.
    /// - [`IoError::Io`] for any other filesystem failure.
    pub fn create_new(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    IoError::DestinationExists(path.display().to_string())
                } else {
                    IoError::Io(e)
                }
            })?;
        Ok(Self {
            file: Some(file),
            written: 0,
        })
    }
}

impl ByteSink for DiskByteSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        match self.file.as_mut() {
            Some(file) => {
                file.write_all(bytes)?;
                self.written += bytes.len() as u64;
                Ok(())
            }
            None => Err(IoError::Lifecycle(
                "write to a closed destination".to_string(),
            )),
        }
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }

    fn close(&mut self) -> Result<(), IoError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sink_counts_bytes_and_closes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = DiskByteSink::create_new(&path).unwrap();
        sink.write_all(&[1, 2, 3, 4]).unwrap();
        sink.write_all(&[5, 6]).unwrap();
        assert_eq!(sink.bytes_written(), 6);
        sink.close().unwrap();
        sink.close().unwrap(); // idempotent

        let err = sink.write_all(&[7]).unwrap_err();
        assert!(matches!(err, IoError::Lifecycle(_)));

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_create_new_rejects_existing_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.bin");
        std::fs::write(&path, b"occupied").unwrap();

        let err = DiskByteSink::create_new(&path).unwrap_err();
        assert!(matches!(err, IoError::DestinationExists(_)));
    }

    #[test]
    fn test_source_reads_chunks_then_eof() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.bin");
        std::fs::write(&path, vec![0xAB; 100]).unwrap();

        let mut source = DiskByteSource::open(&path, BufferChunkSize::Custom(32)).unwrap();
        let mut total = 0;
        let mut buf = [0u8; 32];
        loop {
            let n = source.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert!(buf[..n].iter().all(|&b| b == 0xAB));
            total += n;
        }
        assert_eq!(total, 100);

        source.close().unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }
}
