use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{ConfigError, MalformedReason, MalformedRecord};
use crate::models::decoders::row::Row;
use crate::models::splitters::arena::Record;

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

/// Specifies chunk sizing strategies for `DiskByteStream` and the synchronous readers.
///
/// Provides domain-appropriate defaults but allows override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferChunkSize {
    /// File I/O: Default is 1 MiB chunks.
    FileIO,

    /// HTTP transfers: Default is 64 KiB.
    Http,

    /// In-memory streams: Default is 512 KiB.
    InMemory,

    /// Custom chunk size.
    Custom(usize),
}

impl BufferChunkSize {
    /// Returns the configured chunk size in bytes.
    pub fn chunk_size(self) -> usize {
        match self {
            BufferChunkSize::FileIO => 1024 * 1024, // 1 MiB
            BufferChunkSize::Http => 64 * 1024,     // 64 KiB
            BufferChunkSize::InMemory => 512 * 1024, // 512 KiB
            BufferChunkSize::Custom(n) => n.max(1),
        }
    }
}

/// Record grammar. Chosen once per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Backslash escapes, single-byte delimiter, `\N` nulls.
    #[default]
    TextEscape,
    /// RFC-4180-like quoting, single-byte delimiter, empty-unquoted nulls.
    CsvQuote,
    /// Arbitrary multi-byte delimiter and terminator tokens, fixed column count.
    MultiDelimFixed,
}

/// Record terminator.
///
/// Text and CSV streams detect it from the first terminator seen;
/// multi-delim streams have it fixed up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Lf,
    Cr,
    CrLf,
}

impl Terminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Lf => b"\n",
            Terminator::Cr => b"\r",
            Terminator::CrLf => b"\r\n",
        }
    }
}

impl FromStr for Terminator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lf" => Ok(Terminator::Lf),
            "cr" => Ok(Terminator::Cr),
            "crlf" => Ok(Terminator::CrLf),
            _ => Err(ConfigError::InvalidNewline(s.to_string())),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Terminator::Lf => "LF",
            Terminator::Cr => "CR",
            Terminator::CrLf => "CRLF",
        })
    }
}

/// External byte encoding of a stream.
///
/// Records are framed in the external encoding and converted to UTF-8
/// before fields are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Sjis,
    Gbk,
    Big5,
    Uhc,
    Gb18030,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF8",
            Encoding::Latin1 => "LATIN1",
            Encoding::Sjis => "SJIS",
            Encoding::Gbk => "GBK",
            Encoding::Big5 => "BIG5",
            Encoding::Uhc => "UHC",
            Encoding::Gb18030 => "GB18030",
        }
    }

    /// True when trailing bytes of a multi-byte character may fall in the
    /// ASCII range, so a scanner must step over whole characters.
    pub fn embeds_ascii(self) -> bool {
        matches!(
            self,
            Encoding::Sjis | Encoding::Gbk | Encoding::Big5 | Encoding::Uhc | Encoding::Gb18030
        )
    }

    /// Byte length of the character starting with `lead`.
    pub fn char_len(self, lead: u8) -> usize {
        if lead < 0x80 {
            return 1;
        }
        match self {
            Encoding::Utf8 => match lead {
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                _ => 1,
            },
            Encoding::Latin1 => 1,
            // half-width katakana
            Encoding::Sjis if (0xA1..=0xDF).contains(&lead) => 1,
            Encoding::Sjis | Encoding::Gbk | Encoding::Big5 | Encoding::Uhc | Encoding::Gb18030 => 2,
        }
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "utf8" => Ok(Encoding::Utf8),
            "latin1" | "iso88591" => Ok(Encoding::Latin1),
            "sjis" | "shiftjis" => Ok(Encoding::Sjis),
            "gbk" => Ok(Encoding::Gbk),
            "big5" => Ok(Encoding::Big5),
            "uhc" => Ok(Encoding::Uhc),
            "gb18030" => Ok(Encoding::Gb18030),
            _ => Err(ConfigError::UnknownEncoding(s.to_string())),
        }
    }
}

/// Result of one `next_record` call.
#[derive(Debug)]
pub enum ParseOutcome<'a> {
    /// A complete record. Its fields borrow the decoder until the next call.
    Row(Record<'a>),
    /// The buffer holds no complete record. Feed more bytes, or signal end of input.
    NeedMoreInput,
    /// Clean end: the end-of-stream token, or end of input on a record boundary.
    EndOfStream,
    /// The current record violates the grammar. The stream resumes at the next record.
    Malformed(MalformedRecord),
}

/// Result of one `next_row` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<V> {
    Row(Row<V>),
    NeedMoreInput,
    EndOfStream,
}

/// What a dialect found when looking for the end of the current record.
///
/// Positions index the decoder's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStep {
    /// Record bytes are `start..end`; the next record begins at `next`.
    Record { start: usize, end: usize, next: usize },
    /// No terminator yet. Nothing was committed for the undecided bytes.
    NeedMore,
    /// The stream is over. `pending` holds data that preceded an
    /// end-of-stream token on the same line.
    EndOfStream { pending: Option<Range<usize>>, next: usize },
    /// The record starting at `start` is bad; scanning resumes at `next`.
    Malformed { reason: MalformedReason, start: usize, next: usize },
}
