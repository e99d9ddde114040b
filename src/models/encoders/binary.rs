//! Encoder for the binary row format read by
//! [`BinaryFrameDecoder`](crate::models::decoders::binary::BinaryFrameDecoder).

use std::io;

use crate::constants::{BINARY_SIGNATURE, NULL_FIELD_LENGTH, ROW_MARKER_DATA, ROW_MARKER_END, ROW_MARKER_ERROR};
use crate::traits::frame_encoder::FrameEncoder;
use crate::traits::stream_buffer::StreamBuffer;

/// A frame to write. Borrowed so rows are encoded without copying.
#[derive(Debug, Clone, Copy)]
pub enum BinaryFrameRef<'a> {
    /// Signature, zero flags and an empty extension.
    Header,
    Row(&'a [Option<&'a [u8]>]),
    RemoteError(&'a str),
    End,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFrameEncoder;

fn length_prefix(len: usize) -> io::Result<[u8; 4]> {
    i32::try_from(len)
        .map(i32::to_be_bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "field too large for binary format"))
}

impl FrameEncoder for BinaryFrameEncoder {
    type Frame<'a> = BinaryFrameRef<'a>;

    fn encode<'a, B: StreamBuffer>(&mut self, out: &mut B, frame: &BinaryFrameRef<'a>) -> io::Result<usize> {
        let before = out.len();
        match *frame {
            BinaryFrameRef::Header => {
                out.extend_from_slice(BINARY_SIGNATURE);
                out.extend_from_slice(&0i32.to_be_bytes());
                out.extend_from_slice(&0i32.to_be_bytes());
            }
            BinaryFrameRef::Row(fields) => {
                out.push(ROW_MARKER_DATA);
                for field in fields {
                    match field {
                        Some(bytes) => {
                            out.extend_from_slice(&length_prefix(bytes.len())?);
                            out.extend_from_slice(bytes);
                        }
                        None => out.extend_from_slice(&NULL_FIELD_LENGTH.to_be_bytes()),
                    }
                }
            }
            BinaryFrameRef::RemoteError(message) => {
                out.push(ROW_MARKER_ERROR);
                out.extend_from_slice(&length_prefix(message.len())?);
                out.extend_from_slice(message.as_bytes());
            }
            BinaryFrameRef::End => out.push(ROW_MARKER_END),
        }
        Ok(out.len() - before)
    }
}
