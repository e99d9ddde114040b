//! # Generic Frame Encoder
//!
//! Serialise rows into on-the-wire bytes.
//!
//! - Central place to define how a row becomes a byte sequence (delimited text, binary rows).
//! - Keeps responsibility for buffer management with the caller.
//! - Plays nicely with any sink: files, sockets, in-memory buffers.
//!
//! Implement `FrameEncoder` for your format; call `encode()` to append the wire bytes into a buffer.

use std::io;

use crate::traits::stream_buffer::StreamBuffer;

/// The encoder must only append to the provided buffer and must not retain
/// references to any data passed in.
pub trait FrameEncoder {
    /// The type of frame accepted by this encoder.
    type Frame<'a>;

    /// Append the encoding of `frame` to `out`.
    ///
    /// Returns the number of bytes written, or `Err` if the frame cannot be
    /// represented in this format.
    fn encode<'a, B: StreamBuffer>(&mut self, out: &mut B, frame: &Self::Frame<'a>) -> io::Result<usize>;
}
