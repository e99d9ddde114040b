//! # Input byte buffer
//!
//! Growable window over the not-yet-consumed part of the input.
//!
//! ## Overview
//! - Bytes are appended at the back; a consumed marker advances from the front.
//! - `compact` shifts the unconsumed tail down to index 0 and reports the shift
//!   so scanners can rebase saved positions.
//! - The logical content is always followed by one `0x00` sentinel byte, so
//!   a one-byte lookahead at the very end reads a defined value.
//! - Generic over [`StreamBuffer`], so chunks can live in `Vec<u8>` or `Vec64<u8>`.

use crate::traits::stream_buffer::StreamBuffer;

/// Unconsumed input plus a trailing NUL sentinel.
#[derive(Debug)]
pub struct ByteRingBuffer<B: StreamBuffer = Vec<u8>> {
    // logical bytes, then one sentinel
    buf: B,
    consumed: usize,
    // absolute stream offset of buf[0]
    base_offset: u64,
}

impl<B: StreamBuffer> Default for ByteRingBuffer<B> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<B: StreamBuffer> ByteRingBuffer<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = B::with_capacity(capacity + 1);
        buf.push(0);
        Self { buf, consumed: 0, base_offset: 0 }
    }

    /// Append `chunk` after the current logical end. Returns its length.
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        let len = self.len();
        self.buf.truncate(len);
        self.buf.extend_from_slice(chunk);
        self.buf.push(0);
        chunk.len()
    }

    /// Mark everything before `index` as consumed.
    ///
    /// The marker never moves backwards and never passes the logical end.
    pub fn consumed_up_to(&mut self, index: usize) {
        debug_assert!(index >= self.consumed && index <= self.len());
        self.consumed = index.clamp(self.consumed, self.len());
    }

    /// Drop consumed bytes from the front. Returns how far the remaining
    /// bytes moved down.
    pub fn compact(&mut self) -> usize {
        let shift = self.consumed;
        if shift > 0 {
            self.buf.drain(0..shift);
            self.consumed = 0;
            self.base_offset += shift as u64;
        }
        shift
    }

    /// Logical length, sentinel excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes appended but not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len() - self.consumed
    }

    /// Logical bytes, sentinel excluded.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf.as_ref()[..self.len()]
    }

    /// Logical bytes followed by the sentinel.
    #[inline]
    pub fn padded(&self) -> &[u8] {
        self.buf.as_ref()
    }

    #[inline]
    pub fn unconsumed(&self) -> &[u8] {
        &self.as_slice()[self.consumed..]
    }

    /// Absolute stream offset of buffer index `index`.
    #[inline]
    pub fn absolute_offset(&self, index: usize) -> u64 {
        self.base_offset + index as u64
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity().saturating_sub(1)
    }

    /// View for one scan step.
    pub fn window(&self, at_eof: bool) -> ScanWindow<'_> {
        ScanWindow { padded: self.padded(), len: self.len(), at_eof }
    }
}

/// Read-only view handed to the dialect scanners.
#[derive(Debug, Clone, Copy)]
pub struct ScanWindow<'a> {
    padded: &'a [u8],
    len: usize,
    at_eof: bool,
}

impl<'a> ScanWindow<'a> {
    /// Build a window directly over `data`. Used by tests and one-shot parsing.
    pub fn over(padded: &'a [u8], len: usize, at_eof: bool) -> Self {
        debug_assert!(padded.len() > len);
        Self { padded, len, at_eof }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once no more bytes will ever be appended.
    #[inline]
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Byte at `i`; the sentinel (`0`) for any index at or past the end.
    #[inline]
    pub fn byte(&self, i: usize) -> u8 {
        if i < self.len { self.padded[i] } else { 0 }
    }

    /// Whether `n` bytes starting at `i` are known, either because they
    /// are buffered or because input has ended and they read as sentinel.
    #[inline]
    pub fn has(&self, i: usize, n: usize) -> bool {
        i + n <= self.len || self.at_eof
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        &self.padded[..self.len]
    }
}
