//! # Delimited encoder
//!
//! Serialises rows into the Text, CSV or multi-delimiter dialect so that
//! [`RecordDecoder`](crate::models::decoders::record::RecordDecoder) reads
//! them back unchanged.
//!
//! - Text: control bytes become `\b \f \n \r \t \v`, the delimiter and the
//!   escape are escaped, nulls are the null marker.
//! - CSV: a value is quoted when it holds the delimiter, quote, CR or LF,
//!   when it equals the null marker, when it would read as the end-of-stream
//!   token, or when its column is force-quoted.
//! - Multi-delim: delimiter and terminator tokens are escaped, or every field
//!   is quoted when a quote is configured. Null is an empty field.
//!
//! [`encode_table`] adds a cell formatter for whole `minarrow::Table`s.

use std::io;
use std::sync::Arc;

use minarrow::{Array, Bitmask, NumericArray, Table, TextArray};
use tracing::debug;

use crate::enums::{Dialect, Encoding, Terminator};
use crate::error::MalformedReason;
use crate::options::{ColumnSpec, DialectConfig};
use crate::traits::frame_encoder::FrameEncoder;
use crate::traits::stream_buffer::StreamBuffer;
use crate::traits::transcoder::{BuiltinTranscoder, Transcoder};

#[derive(Debug, Clone)]
pub struct DelimitedEncoder {
    dialect: Dialect,
    delimiter: Vec<u8>,
    terminator: Terminator,
    quote: Option<u8>,
    escape: Option<u8>,
    null_marker: Vec<u8>,
    end_of_stream: Option<[u8; 2]>,
    encoding: Encoding,
    columns: Arc<[ColumnSpec]>,
    transcoder: BuiltinTranscoder,
    scratch: Vec<u8>,
}

impl DelimitedEncoder {
    pub fn new(config: &DialectConfig) -> Self {
        let quote = config.quote();
        Self {
            dialect: config.dialect(),
            delimiter: config.delimiter().unwrap_or_default().to_vec(),
            terminator: config.terminator().unwrap_or(Terminator::Lf),
            quote,
            escape: match config.dialect() {
                Dialect::CsvQuote => config.escape().or(quote),
                _ => config.escape(),
            },
            null_marker: config.null_marker().to_vec(),
            end_of_stream: config.end_of_stream(),
            encoding: config.encoding(),
            columns: Arc::clone(config.columns()),
            transcoder: BuiltinTranscoder::new(config.encoding()),
            scratch: Vec::new(),
        }
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Column names as one record.
    pub fn encode_header<B: StreamBuffer>(&mut self, out: &mut B) -> io::Result<usize> {
        let names: Vec<Vec<u8>> = self.columns.iter().map(|c| c.name.clone().into_bytes()).collect();
        let row: Vec<Option<&[u8]>> = names.iter().map(|n| Some(n.as_slice())).collect();
        self.encode_row(out, &row, false)
    }

    /// The end-of-stream token and terminator, when the dialect has one.
    pub fn encode_end_marker<B: StreamBuffer>(&mut self, out: &mut B) -> usize {
        match self.end_of_stream {
            Some(token) => {
                out.extend_from_slice(&token);
                out.extend_from_slice(self.terminator.as_bytes());
                token.len() + self.terminator.as_bytes().len()
            }
            None => 0,
        }
    }

    fn encode_row<B: StreamBuffer>(
        &mut self,
        out: &mut B,
        row: &[Option<&[u8]>],
        check_width: bool,
    ) -> io::Result<usize> {
        if check_width && !self.columns.is_empty() && row.len() != self.columns.len() {
            return Err(MalformedReason::FieldCount { expected: self.columns.len(), found: row.len() }.into());
        }
        let mut line = std::mem::take(&mut self.scratch);
        line.clear();
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                line.extend_from_slice(&self.delimiter);
            }
            match (self.dialect, field) {
                (Dialect::MultiDelimFixed, None) => {
                    if let Some(q) = self.quote {
                        line.extend_from_slice(&[q, q]);
                    }
                }
                (_, None) => line.extend_from_slice(&self.null_marker),
                (Dialect::TextEscape, Some(value)) => self.text_field(&mut line, value),
                (Dialect::CsvQuote, Some(value)) => {
                    let force = self.columns.get(i).is_some_and(|c| c.force_quote);
                    self.csv_field(&mut line, value, force, row.len() == 1)
                }
                (Dialect::MultiDelimFixed, Some(value)) => self.multi_field(&mut line, value),
            }
        }
        line.extend_from_slice(self.terminator.as_bytes());

        let written = match self.transcoder.to_external(&line) {
            Ok(bytes) => {
                out.extend_from_slice(&bytes);
                bytes.len()
            }
            Err(reason) => {
                self.scratch = line;
                return Err(reason.into());
            }
        };
        self.scratch = line;
        Ok(written)
    }

    /// Length of the character at `value[i]` when it must be copied whole.
    #[inline]
    fn whole_char(&self, value: &[u8], i: usize) -> Option<usize> {
        let c = value[i];
        if c >= 0x80 && self.encoding.embeds_ascii() {
            Some(self.encoding.char_len(c).min(value.len() - i))
        } else {
            None
        }
    }

    fn text_field(&self, line: &mut Vec<u8>, value: &[u8]) {
        let Some(escape) = self.escape else {
            line.extend_from_slice(value);
            return;
        };
        let delimiter = self.delimiter.first().copied();
        let mut i = 0;
        while i < value.len() {
            if let Some(n) = self.whole_char(value, i) {
                line.extend_from_slice(&value[i..i + n]);
                i += n;
                continue;
            }
            let c = value[i];
            let named = match c {
                0x08 => Some(b'b'),
                0x0c => Some(b'f'),
                b'\n' => Some(b'n'),
                b'\r' => Some(b'r'),
                b'\t' => Some(b't'),
                0x0b => Some(b'v'),
                _ => None,
            };
            if let Some(letter) = named {
                line.extend_from_slice(&[escape, letter]);
            } else if c == escape || Some(c) == delimiter {
                line.extend_from_slice(&[escape, c]);
            } else {
                line.push(c);
            }
            i += 1;
        }
    }

    fn csv_field(&self, line: &mut Vec<u8>, value: &[u8], force: bool, single_column: bool) {
        let quote = self.quote.unwrap_or(b'"');
        let escape = self.escape.unwrap_or(quote);
        let delimiter = self.delimiter.first().copied();

        let looks_like_end = single_column && self.end_of_stream.is_some_and(|t| value == t);
        let mut needs_quote = force || looks_like_end || value == self.null_marker.as_slice();
        if !needs_quote {
            let mut i = 0;
            while i < value.len() {
                if let Some(n) = self.whole_char(value, i) {
                    i += n;
                    continue;
                }
                let c = value[i];
                if Some(c) == delimiter || c == quote || c == b'\n' || c == b'\r' {
                    needs_quote = true;
                    break;
                }
                i += 1;
            }
        }
        if !needs_quote {
            line.extend_from_slice(value);
            return;
        }

        line.push(quote);
        let mut i = 0;
        while i < value.len() {
            if let Some(n) = self.whole_char(value, i) {
                line.extend_from_slice(&value[i..i + n]);
                i += n;
                continue;
            }
            let c = value[i];
            if c == quote || c == escape {
                line.push(escape);
            }
            line.push(c);
            i += 1;
        }
        line.push(quote);
    }

    fn multi_field(&self, line: &mut Vec<u8>, value: &[u8]) {
        if let Some(q) = self.quote {
            line.push(q);
            for &c in value {
                if let Some(e) = self.escape {
                    if c == q || c == e {
                        line.push(e);
                    }
                }
                line.push(c);
            }
            line.push(q);
            return;
        }
        let Some(escape) = self.escape else {
            line.extend_from_slice(value);
            return;
        };
        let eol = self.terminator.as_bytes();
        let mut i = 0;
        while i < value.len() {
            let rest = &value[i..];
            if rest.starts_with(&self.delimiter) {
                line.push(escape);
                line.extend_from_slice(&self.delimiter);
                i += self.delimiter.len();
            } else if rest.starts_with(eol) {
                line.push(escape);
                line.extend_from_slice(eol);
                i += eol.len();
            } else {
                if rest[0] == escape {
                    line.push(escape);
                }
                line.push(rest[0]);
                i += 1;
            }
        }
    }
}

impl FrameEncoder for DelimitedEncoder {
    type Frame<'a> = &'a [Option<&'a [u8]>];

    fn encode<'a, B: StreamBuffer>(&mut self, out: &mut B, frame: &&'a [Option<&'a [u8]>]) -> io::Result<usize> {
        self.encode_row(out, frame, true)
    }
}

/// Encode every row of `table`. Cells are formatted the way the decoder's
/// table builder parses them back.
pub fn encode_table<B: StreamBuffer>(encoder: &mut DelimitedEncoder, table: &Table, out: &mut B) -> io::Result<usize> {
    debug!(rows = table.n_rows, cols = table.cols.len(), "encoding table");

    let masks: Vec<Option<&Bitmask>> = table
        .cols
        .iter()
        .map(|col| match &col.array {
            Array::NumericArray(arr) => arr.null_mask(),
            Array::BooleanArray(arr) => arr.null_mask.as_ref(),
            Array::TextArray(TextArray::String32(arr)) => arr.null_mask.as_ref(),
            Array::TextArray(TextArray::Categorical32(arr)) => arr.null_mask.as_ref(),
            _ => None,
        })
        .collect();

    let mut written = 0;
    let mut cells: Vec<Option<Vec<u8>>> = Vec::with_capacity(table.cols.len());
    for row in 0..table.n_rows {
        cells.clear();
        for (col_idx, col) in table.cols.iter().enumerate() {
            // Arrow: 1 = valid
            let is_null = col.null_count > 0 && masks[col_idx].is_some_and(|m| !m.get(row));
            cells.push(if is_null { None } else { format_cell(&col.array, row)? });
        }
        let refs: Vec<Option<&[u8]>> = cells.iter().map(|c| c.as_deref()).collect();
        written += encoder.encode(out, &refs.as_slice())?;
    }
    Ok(written)
}

fn format_cell(array: &Array, row: usize) -> io::Result<Option<Vec<u8>>> {
    let text = match array {
        Array::NumericArray(NumericArray::Int32(arr)) => arr.data.as_ref()[row].to_string(),
        Array::NumericArray(NumericArray::Int64(arr)) => arr.data.as_ref()[row].to_string(),
        Array::NumericArray(NumericArray::UInt32(arr)) => arr.data.as_ref()[row].to_string(),
        Array::NumericArray(NumericArray::UInt64(arr)) => arr.data.as_ref()[row].to_string(),
        Array::NumericArray(NumericArray::Float32(arr)) => arr.data.as_ref()[row].to_string(),
        Array::NumericArray(NumericArray::Float64(arr)) => arr.data.as_ref()[row].to_string(),
        Array::BooleanArray(arr) => (if arr.data.get(row) { "true" } else { "false" }).to_string(),
        Array::TextArray(TextArray::String32(arr)) => {
            let offsets = arr.offsets.as_ref();
            let start = offsets[row] as usize;
            let end = offsets[row + 1] as usize;
            return Ok(Some(arr.data.as_ref()[start..end].to_vec()));
        }
        Array::TextArray(TextArray::Categorical32(arr)) => {
            let key = arr.data.as_ref()[row] as usize;
            arr.unique_values.get(key).cloned().unwrap_or_default()
        }
        _ => {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "unsupported column type for delimited output"));
        }
    };
    Ok(Some(text.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DialectOptions;

    fn encode(options: DialectOptions, columns: usize, row: &[Option<&[u8]>]) -> Vec<u8> {
        let config = DialectConfig::with_text_columns(&options, columns).unwrap();
        let mut enc = DelimitedEncoder::new(&config);
        let mut out: Vec<u8> = Vec::new();
        enc.encode(&mut out, &row).unwrap();
        out
    }

    #[test]
    fn test_text_escapes() {
        let out = encode(
            DialectOptions::text(),
            3,
            &[Some(b"a\tb\nc".as_slice()), None, Some(b"back\\slash\x08".as_slice())],
        );
        assert_eq!(out, b"a\\tb\\nc\t\\N\tback\\\\slash\\b\n");
    }

    #[test]
    fn test_text_escape_off_is_verbatim() {
        let opts = DialectOptions { escape: Some("off".into()), ..DialectOptions::text() };
        let out = encode(opts, 1, &[Some(b"a\\b".as_slice())]);
        assert_eq!(out, b"a\\b\n");
    }

    #[test]
    fn test_csv_quoting_rules() {
        let out = encode(
            DialectOptions::csv(),
            4,
            &[Some(b"plain".as_slice()), Some(b"a,b".as_slice()), Some(b"".as_slice()), None],
        );
        assert_eq!(out, b"plain,\"a,b\",\"\",\n");

        let out = encode(DialectOptions::csv(), 1, &[Some(b"say \"hi\"".as_slice())]);
        assert_eq!(out, b"\"say \"\"hi\"\"\"\n");

        let out = encode(DialectOptions::csv(), 1, &[Some(b"\\.".as_slice())]);
        assert_eq!(out, b"\"\\.\"\n");
    }

    #[test]
    fn test_csv_force_quote() {
        let config = DialectOptions::csv()
            .validate(vec![ColumnSpec::text("a").with_force_quote(), ColumnSpec::text("b")])
            .unwrap();
        let mut enc = DelimitedEncoder::new(&config);
        let mut out: Vec<u8> = Vec::new();
        let row: &[Option<&[u8]>] = &[Some(b"x".as_slice()), Some(b"y".as_slice())];
        enc.encode(&mut out, &row).unwrap();
        assert_eq!(out, b"\"x\",y\n");
    }

    #[test]
    fn test_multi_delim_escapes_tokens() {
        let opts = DialectOptions { escape: Some("\\".into()), ..DialectOptions::multi_delim(";;") };
        let out = encode(opts, 3, &[Some(b"a;;b".as_slice()), None, Some(b"x\ny\\".as_slice())]);
        assert_eq!(out, b"a\\;;b;;;;x\\\ny\\\\\n");
    }

    #[test]
    fn test_row_width_is_checked() {
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 2).unwrap();
        let mut enc = DelimitedEncoder::new(&config);
        let mut out: Vec<u8> = Vec::new();
        let row: &[Option<&[u8]>] = &[Some(b"only".as_slice())];
        assert!(enc.encode(&mut out, &row).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_end_marker_and_header() {
        let config = DialectOptions { header: true, ..DialectOptions::csv() }
            .validate(vec![ColumnSpec::text("id"), ColumnSpec::text("a,b")])
            .unwrap();
        let mut enc = DelimitedEncoder::new(&config);
        let mut out: Vec<u8> = Vec::new();
        enc.encode_header(&mut out).unwrap();
        enc.encode_end_marker(&mut out);
        assert_eq!(out, b"id,\"a,b\"\n\\.\n");
    }
}
