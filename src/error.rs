//! Error taxonomy for the codec.
//!
//! - [`ConfigError`]: rejected options, raised once when a dialect is validated.
//! - [`MalformedReason`]: the closed set of grammar violations, with stable messages.
//! - [`MalformedRecord`]: a reason located in the stream (record number, offset, bytes).
//! - [`FieldDecodeError`] / [`ColumnDecodeError`]: failures of the injected field decoder.
//! - [`RowError`]: what `next_row` can fail with.
//! - [`CodecError`]: the umbrella used by readers, writers and streams.

use std::io;

use thiserror::Error;

use crate::utils::DisplayBytes;

/// Option validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("delimiter must be a single one-byte character")]
    DelimiterNotSingleByte,
    #[error("missing delimiter option")]
    MissingDelimiter,
    #[error("delimiter cannot be newline or carriage return")]
    DelimiterIsNewline,
    #[error("delimiter cannot be \"{0}\"")]
    ReservedDelimiter(char),
    #[error("null representation cannot use newline or carriage return")]
    NullMarkerHasNewline,
    #[error("delimiter must not appear in the NULL specification")]
    DelimiterInNullMarker,
    #[error("quote character must not appear in the NULL specification")]
    QuoteInNullMarker,
    #[error("quote available only in CSV mode")]
    QuoteNotAllowed,
    #[error("quote must be a single one-byte character")]
    QuoteNotSingleByte,
    #[error("quote cannot be newline or carriage return")]
    QuoteIsNewline,
    #[error("delimiter and quote must be different")]
    DelimiterIsQuote,
    #[error("escape must be a single one-byte character, or off")]
    EscapeNotSingleByte,
    #[error("escape cannot use newline or carriage return")]
    EscapeIsNewline,
    #[error("NEWLINE can only be LF, CRLF, or CR")]
    InvalidNewline(String),
    #[error("unsupported encoding \"{0}\"")]
    UnknownEncoding(String),
    #[error("force not null available only in CSV mode")]
    ForceNotNullNotCsv,
    #[error("force null available only in CSV mode")]
    ForceNullNotCsv,
    #[error("end-of-stream token must be exactly two bytes")]
    EndOfStreamToken,
    #[error("HEADER not available for the multi-byte delimiter dialect")]
    HeaderNotSupported,
    #[error("invalid (ROWS) reject limit value '{0}', valid values are 2 or larger")]
    RejectRows(u64),
    #[error("invalid (PERCENT) reject limit value '{0}', valid values are 1 to 100")]
    RejectPercent(u32),
}

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    #[error("extra data after last expected column")]
    ExtraData,
    #[error("missing data for column \"{0}\"")]
    MissingColumn(String),
    #[error("missing data for column \"{0}\", found empty data line")]
    EmptyDataLine(String),
    #[error("end-of-copy marker corrupt")]
    EndMarkerCorrupt,
    #[error("end-of-copy marker does not match previous newline style")]
    EndMarkerNewlineMismatch,
    #[error("literal carriage return found in data")]
    LiteralCarriageReturn,
    #[error("unquoted carriage return found in data")]
    UnquotedCarriageReturn,
    #[error("literal newline found in data")]
    LiteralNewline,
    #[error("unquoted newline found in data")]
    UnquotedNewline,
    #[error("invalid byte sequence for encoding \"{0}\"")]
    InvalidEncoding(&'static str),
    #[error("character cannot be represented in encoding \"{0}\"")]
    UntranslatableCharacter(&'static str),
    // multi-byte delimiter dialect
    #[error("Unable to find a row of data")]
    IncompleteRow,
    #[error("Missing quote in row head or tail")]
    MissingRowQuote,
    #[error("Missing quote before some column")]
    MissingColumnQuote,
    #[error("Found an unescaped quote character")]
    UnescapedQuote,
    #[error("Expected {expected} columns but found {found} in the row")]
    TooManyColumns { expected: usize, found: usize },
    #[error("Expected {expected} columns in row but found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("Did not find expected `{0}` character when `quote` value was provided")]
    MissingQuotedToken(&'static str),
    // binary rows
    #[error("file signature not recognized")]
    BadSignature,
    #[error("invalid file header (missing flags)")]
    MissingFlags,
    #[error("invalid file header (WITH OIDS)")]
    WithOids,
    #[error("unrecognized critical flags in file header")]
    CriticalFlags,
    #[error("invalid file header (missing length)")]
    MissingHeaderLength,
    #[error("invalid file header (wrong length)")]
    WrongHeaderLength,
    #[error("invalid field size")]
    InvalidFieldSize,
    #[error("row field count is {found}, expected {expected}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid row marker 0x{0:02x}")]
    InvalidRowMarker(u8),
    #[error("received data after end marker")]
    DataAfterEndMarker,
}

impl From<MalformedReason> for io::Error {
    fn from(reason: MalformedReason) -> Self {
        let kind = match reason {
            MalformedReason::UnexpectedEof => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, reason)
    }
}

/// A [`MalformedReason`] located in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (record {record}, offset {offset}): \"{data}\"")]
pub struct MalformedRecord {
    pub reason: MalformedReason,
    /// 1-based number of the offending record.
    pub record: u64,
    /// Absolute byte offset of the record start.
    pub offset: u64,
    /// Offending bytes, capped for display.
    pub data: DisplayBytes,
}

/// Failure reported by a caller-supplied field decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldDecodeError {
    pub message: String,
}

impl FieldDecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A [`FieldDecodeError`] attributed to its column and record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source}, column {column_name}: \"{value}\"")]
pub struct ColumnDecodeError {
    pub column: usize,
    pub column_name: String,
    pub record: u64,
    pub offset: u64,
    pub value: DisplayBytes,
    pub source: FieldDecodeError,
}

/// Errors out of `RowAssembler::next_row`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error(transparent)]
    Malformed(#[from] MalformedRecord),
    #[error(transparent)]
    Decode(#[from] ColumnDecodeError),
}

impl RowError {
    /// 1-based record number the error belongs to.
    pub fn record(&self) -> u64 {
        match self {
            RowError::Malformed(m) => m.record,
            RowError::Decode(d) => d.record,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            RowError::Malformed(m) => m.offset,
            RowError::Decode(d) => d.offset,
        }
    }

    /// Name of the offending column, when the error is tied to one.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            RowError::Malformed(_) => None,
            RowError::Decode(d) => Some(&d.column_name),
        }
    }

    pub fn raw(&self) -> &DisplayBytes {
        match self {
            RowError::Malformed(m) => &m.data,
            RowError::Decode(d) => &d.value,
        }
    }
}

/// Umbrella error for readers, writers and streams.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Row(#[from] RowError),
    #[error("reject limit reached after {rejected} rejected rows, last error: {last}")]
    RejectLimit { rejected: u64, last: RowError },
    #[error("value cannot be encoded: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<MalformedRecord> for CodecError {
    fn from(m: MalformedRecord) -> Self {
        CodecError::Row(RowError::Malformed(m))
    }
}

impl From<CodecError> for io::Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
