use minarrow::Vec64;

/// Abstraction over a growable byte buffer used for incremental decoding.
///
/// The record decoder keeps unconsumed input in one of these, and the async
/// chunk sources hand their chunks over in one. It is implemented for
/// standard `Vec<u8>` and `minarrow::Vec64<u8>`, and can be implemented for
/// other byte containers when the IO stack around the codec is fixed.
///
/// Implementors must support the following standard `Vec` operations:
/// - Draining consumed bytes from the front
/// - Appending new bytes
/// - Truncating back to a shorter length
/// - Querying length and capacity
pub trait StreamBuffer: AsRef<[u8]> + Default + Extend<u8> + 'static {
    /// Alignment the buffer's allocation starts on.
    const ALIGN: usize;

    /// Create with given capacity.
    fn with_capacity(n: usize) -> Self;

    // Reserves additional capacity in the buffer
    fn reserve(&mut self, additional: usize);

    /// Remove the specified range from the front of the buffer.
    fn drain(&mut self, range: std::ops::Range<usize>);
    /// Shorten the buffer to `len` bytes. No-op when already shorter.
    fn truncate(&mut self, len: usize);
    /// Current length (in bytes).
    fn len(&self) -> usize;
    /// Allocated capacity (in bytes).
    fn capacity(&self) -> usize;
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

    fn truncate(&mut self, len: usize) {
        Vec::<u8>::truncate(self, len)
    }

    fn len(&self) -> usize {
        Vec::<u8>::len(self)
    }

    fn capacity(&self) -> usize {
        Vec::<u8>::capacity(self)
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

impl StreamBuffer for Vec64<u8> {
    /// `Vec64` allocations start on 64-byte boundaries, so chunks read into
    /// one can be handed to `Minarrow` buffers without re-copying.
    const ALIGN: usize = 64;

    fn with_capacity(n: usize) -> Self {
        Vec64::with_capacity(n)
    }

    fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }

    fn drain(&mut self, range: std::ops::Range<usize>) {
        self.0.drain(range);
    }

    fn truncate(&mut self, len: usize) {
        self.0.truncate(len)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn capacity(&self) -> usize {
        self.0.capacity()
    }

    fn extend_from_slice(&mut self, data: &[u8]) {
        self.0.extend_from_slice(data)
    }
    fn push(&mut self, byte: u8) {
        self.0.push(byte)
    }
    fn from_slice(data: &[u8]) -> Self {
        Vec64::from_slice(data)
    }
}
