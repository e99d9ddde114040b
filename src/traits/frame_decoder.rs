//! Generic frame decoding infrastructure.
//!
//! A frame is a self-contained unit cut out of a byte stream. For the binary
//! row format that is the file header, one row, or the end marker.
//!
//! A `FrameDecoder` only inspects the passed-in buffer and reports how many
//! bytes make up the next complete frame.
//
//  Usage:
//  - Call `decode(&mut self, &[u8])` repeatedly as more bytes arrive.
//  - On `Frame { ... }`, consume the reported number of bytes and process the returned frame.
//  - On `NeedMore`, retain all bytes in the buffer and supply more data.
//  - Once the source is exhausted, call `decode_eof` with whatever is left.
//  - On `Err`, treat as protocol violation or irrecoverable stream error.

use std::io;

use crate::enums::DecodeResult;

/// A trait for pull-based frame decoders.
///
/// ### Contract
/// - The decoder musn't mutate or take ownership of the input buffer.
/// - It musn't remove bytes itself. Return `consumed` and the caller drops them.
/// - It should always leave the buffer unchanged if returning `NeedMore`.
pub trait FrameDecoder {
    /// The type of frame yielded by this decoder.
    type Frame;

    /// Attempt to decode a complete frame from the start of `buf`.
    ///
    /// Return:
    /// - `Ok(Frame { frame, consumed })` if a full frame is present. Caller removes `consumed` bytes.
    /// - `Ok(NeedMore)` if more bytes are required; buffer remains unchanged.
    /// - `Err` if the protocol is violated, or an unrecoverable error is detected.
    fn decode(&mut self, buf: &[u8]) -> io::Result<DecodeResult<Self::Frame>>;

    /// Called once the source has no more bytes to give.
    ///
    /// `NeedMore` here means the stream ended cleanly. The default treats any
    /// leftover bytes as a truncated frame.
    fn decode_eof(&mut self, buf: &[u8]) -> io::Result<DecodeResult<Self::Frame>> {
        match self.decode(buf)? {
            DecodeResult::NeedMore if !buf.is_empty() => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated frame at end of stream",
            )),
            other => Ok(other),
        }
    }
}
