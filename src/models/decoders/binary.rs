//! Decoder for the binary row format.
//!
//! Layout:
//! - 8-byte signature, 4-byte big-endian flags, 4-byte extension length,
//!   then the extension bytes
//! - per row a marker byte:
//!   - `0x02` data: one big-endian `i32` length per column followed by the
//!     bytes, with `-1` for null
//!   - `0x03` remote error: `i32` length and a message
//!   - `0x01` end of data
//!
//! The column count is not in-band, so the decoder is built with it.

use std::io;

use tracing::{debug, trace};

use crate::constants::{
    BINARY_FLAG_WITH_OIDS, BINARY_HEADER_LEN, BINARY_SIGNATURE, BINARY_SIGNATURE_LEN, FIELD_LENGTH_PREFIX,
    NULL_FIELD_LENGTH, ROW_MARKER_DATA, ROW_MARKER_END, ROW_MARKER_ERROR,
};
use crate::enums::DecodeResult;
use crate::error::MalformedReason;
use crate::traits::frame_decoder::FrameDecoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryFrame {
    Header { flags: i32, extension: Vec<u8> },
    Row(Vec<Option<Vec<u8>>>),
    /// Error reported in-band by the producer.
    RemoteError(String),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Rows,
    Ended,
}

#[derive(Debug, Clone)]
pub struct BinaryFrameDecoder {
    columns: usize,
    state: State,
}

impl BinaryFrameDecoder {
    pub fn new(columns: usize) -> Self {
        Self { columns, state: State::Header }
    }

    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    fn decode_header(&mut self, buf: &[u8], at_eof: bool) -> Result<DecodeResult<BinaryFrame>, MalformedReason> {
        let sig_len = buf.len().min(BINARY_SIGNATURE_LEN);
        if buf[..sig_len] != BINARY_SIGNATURE[..sig_len] || (at_eof && sig_len < BINARY_SIGNATURE_LEN) {
            return Err(MalformedReason::BadSignature);
        }
        let Some(flags) = read_i32(buf, BINARY_SIGNATURE_LEN) else {
            return short(at_eof, MalformedReason::MissingFlags);
        };
        if flags & BINARY_FLAG_WITH_OIDS != 0 {
            return Err(MalformedReason::WithOids);
        }
        if (flags & !BINARY_FLAG_WITH_OIDS) >> 16 != 0 {
            return Err(MalformedReason::CriticalFlags);
        }
        let ext_len = match read_i32(buf, BINARY_SIGNATURE_LEN + FIELD_LENGTH_PREFIX) {
            Some(n) if n < 0 => return Err(MalformedReason::MissingHeaderLength),
            Some(n) => n as usize,
            None => return short(at_eof, MalformedReason::MissingHeaderLength),
        };
        let total = BINARY_HEADER_LEN + ext_len;
        if buf.len() < total {
            return short(at_eof, MalformedReason::WrongHeaderLength);
        }
        self.state = State::Rows;
        debug!(flags, extension = ext_len, "binary header");
        Ok(DecodeResult::Frame {
            frame: BinaryFrame::Header { flags, extension: buf[BINARY_HEADER_LEN..total].to_vec() },
            consumed: total,
        })
    }

    fn decode_row(&mut self, buf: &[u8]) -> Result<DecodeResult<BinaryFrame>, MalformedReason> {
        let Some(&marker) = buf.first() else {
            return Ok(DecodeResult::NeedMore);
        };
        match marker {
            ROW_MARKER_END => {
                self.state = State::Ended;
                debug!("binary end marker");
                Ok(DecodeResult::Frame { frame: BinaryFrame::End, consumed: 1 })
            }
            ROW_MARKER_ERROR => {
                let Some(len) = read_i32(buf, 1) else {
                    return Ok(DecodeResult::NeedMore);
                };
                let len = usize::try_from(len).map_err(|_| MalformedReason::InvalidFieldSize)?;
                let end = 1 + FIELD_LENGTH_PREFIX + len;
                if buf.len() < end {
                    return Ok(DecodeResult::NeedMore);
                }
                let message = String::from_utf8_lossy(&buf[1 + FIELD_LENGTH_PREFIX..end]).into_owned();
                Ok(DecodeResult::Frame { frame: BinaryFrame::RemoteError(message), consumed: end })
            }
            ROW_MARKER_DATA => {
                let mut pos = 1;
                let mut fields = Vec::with_capacity(self.columns);
                for _ in 0..self.columns {
                    let Some(len) = read_i32(buf, pos) else {
                        return Ok(DecodeResult::NeedMore);
                    };
                    pos += FIELD_LENGTH_PREFIX;
                    if len == NULL_FIELD_LENGTH {
                        fields.push(None);
                        continue;
                    }
                    let len = usize::try_from(len).map_err(|_| MalformedReason::InvalidFieldSize)?;
                    if buf.len() < pos + len {
                        return Ok(DecodeResult::NeedMore);
                    }
                    fields.push(Some(buf[pos..pos + len].to_vec()));
                    pos += len;
                }
                trace!(fields = fields.len(), bytes = pos, "binary row");
                Ok(DecodeResult::Frame { frame: BinaryFrame::Row(fields), consumed: pos })
            }
            other => Err(MalformedReason::InvalidRowMarker(other)),
        }
    }
}

fn short(at_eof: bool, reason: MalformedReason) -> Result<DecodeResult<BinaryFrame>, MalformedReason> {
    if at_eof { Err(reason) } else { Ok(DecodeResult::NeedMore) }
}

#[inline]
fn read_i32(buf: &[u8], at: usize) -> Option<i32> {
    let bytes = buf.get(at..at + FIELD_LENGTH_PREFIX)?;
    Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

impl FrameDecoder for BinaryFrameDecoder {
    type Frame = BinaryFrame;

    fn decode(&mut self, buf: &[u8]) -> io::Result<DecodeResult<BinaryFrame>> {
        let result = match self.state {
            State::Header => self.decode_header(buf, false),
            State::Rows => self.decode_row(buf),
            State::Ended => Ok(DecodeResult::NeedMore),
        };
        result.map_err(io::Error::from)
    }

    fn decode_eof(&mut self, buf: &[u8]) -> io::Result<DecodeResult<BinaryFrame>> {
        match self.state {
            State::Header if !buf.is_empty() => self.decode_header(buf, true).map_err(io::Error::from),
            State::Ended if !buf.is_empty() => Err(MalformedReason::DataAfterEndMarker.into()),
            _ => match self.decode(buf)? {
                DecodeResult::NeedMore if !buf.is_empty() => Err(MalformedReason::UnexpectedEof.into()),
                other => Ok(other),
            },
        }
    }
}
