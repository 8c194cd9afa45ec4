/// Abstraction over a byte buffer for frame-based streaming.
///
/// This trait defines the required interface for the internal buffers used by
/// the framing layers: encoded frames are assembled into, and decoded frames
/// are copied out of, a `StreamBuffer`.
///
/// It is implemented for standard `Vec<u8>`, but can also be implemented for
/// alternative byte buffer types (e.g., an over-aligned vector for SIMD
/// workloads). The `ALIGN` constant drives all padding decisions in the
/// encoders, so a buffer with a larger alignment automatically produces
/// correspondingly padded frames without changes to the framing logic.
///
/// Implementors must support the following standard `Vec` operations:
/// - Draining consumed bytes
/// - Appending new bytes
/// - Querying the current buffer length
/// - Accessing the internal byte slice
pub trait StreamBuffer: AsRef<[u8]> + Default + 'static {
    /// Alignment boundary the data buffers should be padded to.
    /// Must be a multiple of 8, the wire format's minimum alignment.
    const ALIGN: usize;

    /// Create with given capacity.
    fn with_capacity(n: usize) -> Self;

    /// Reserves additional capacity in the buffer.
    fn reserve(&mut self, additional: usize);

    /// Remove the specified range from the front of the buffer.
    fn drain(&mut self, range: std::ops::Range<usize>);

    /// Current length (in bytes).
    fn len(&self) -> usize;

    /// Whether the buffer is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append bytes from a slice.
    fn extend_from_slice(&mut self, data: &[u8]);

    /// Push a single byte to the end of the buffer.
    fn push(&mut self, byte: u8);

    /// Create a buffer from a slice (copies the bytes).
    fn from_slice(data: &[u8]) -> Self;
}

impl StreamBuffer for Vec<u8> {
    // Wire-format minimum alignment
    const ALIGN: usize = 8;

    fn with_capacity(n: usize) -> Self {
        Vec::with_capacity(n)
    }

    fn reserve(&mut self, additional: usize) {
        Vec::<u8>::reserve(self, additional);
    }

    fn drain(&mut self, range: std::ops::Range<usize>) {
        // Call Vec::<T>::drain, ignore the returned Drain iterator
        Vec::<u8>::drain(self, range);
    }

    fn len(&self) -> usize {
        Vec::<u8>::len(self)
    }

    fn extend_from_slice(&mut self, data: &[u8]) {
        Vec::<u8>::extend_from_slice(self, data)
    }

    fn push(&mut self, byte: u8) {
        Vec::<u8>::push(self, byte)
    }

    fn from_slice(data: &[u8]) -> Self {
        data.to_vec()
    }
}
