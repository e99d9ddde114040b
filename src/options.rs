//! User-facing dialect options and their validated form.
//!
//! [`DialectOptions`] carries what a caller writes down (strings, optional
//! values). [`DialectOptions::validate`] applies the per-dialect defaults,
//! rejects impossible combinations, and yields an immutable
//! [`DialectConfig`] shared by the decoder, encoder and writer.

use std::sync::Arc;

use minarrow::ArrowType;

use crate::constants::{
    CSV_DEFAULT_DELIMITER, CSV_DEFAULT_NULL, CSV_DEFAULT_QUOTE, DEFAULT_END_OF_STREAM,
    TEXT_DEFAULT_DELIMITER, TEXT_DEFAULT_ESCAPE, TEXT_DEFAULT_NULL, TEXT_RESERVED_DELIMITERS,
};
use crate::enums::{Dialect, Encoding, Terminator};
use crate::error::ConfigError;

/// One expected column of the target row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    /// Type hint handed to the field decoder.
    pub type_hint: ArrowType,
    /// CSV only: a null field becomes the null-marker string instead.
    pub force_not_null: bool,
    /// CSV only: a field equal to the null marker is null, even when quoted.
    pub force_null: bool,
    /// Writer only: always quote this column in CSV output.
    pub force_quote: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, type_hint: ArrowType) -> Self {
        Self {
            name: name.into(),
            type_hint,
            force_not_null: false,
            force_null: false,
            force_quote: false,
        }
    }

    /// Untyped text column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ArrowType::String)
    }

    pub fn with_force_not_null(mut self) -> Self {
        self.force_not_null = true;
        self
    }

    pub fn with_force_null(mut self) -> Self {
        self.force_null = true;
        self
    }

    pub fn with_force_quote(mut self) -> Self {
        self.force_quote = true;
        self
    }
}

/// Options controlling how a delimited stream is read and written.
///
/// Leave a field as `None` to take the dialect's default:
///
/// | option      | TEXT  | CSV  | multi-delim |
/// |-------------|-------|------|-------------|
/// | delimiter   | `\t`  | `,`  | required    |
/// | null marker | `\N`  | ``   | unused      |
/// | quote       | n/a   | `"`  | none        |
/// | escape      | `\`   | quote | quote, or none |
/// | newline     | detected | detected | `LF` |
///
/// `delimiter = "off"` (TEXT/CSV) treats the whole line as one field, and
/// `escape = "off"` (TEXT) disables escapes.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectOptions {
    pub dialect: Dialect,
    pub delimiter: Option<String>,
    /// `LF`, `CR` or `CRLF`, case-insensitive.
    pub newline: Option<String>,
    pub quote: Option<String>,
    pub escape: Option<String>,
    pub null_marker: Option<String>,
    /// Pad short rows with column defaults instead of rejecting them.
    pub fill_missing: bool,
    /// Discard the first record.
    pub header: bool,
    /// Two-byte end-of-stream token, or `"off"`. Defaults to `\.`.
    pub end_of_stream: Option<String>,
    pub encoding: Encoding,
    /// Accept a bare CR or LF that does not match the detected terminator
    /// as data instead of rejecting the record.
    pub lenient_newlines: bool,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::TextEscape,
            delimiter: None,
            newline: None,
            quote: None,
            escape: None,
            null_marker: None,
            fill_missing: false,
            header: false,
            end_of_stream: None,
            encoding: Encoding::Utf8,
            lenient_newlines: true,
        }
    }
}

impl DialectOptions {
    /// TEXT dialect with defaults.
    pub fn text() -> Self {
        Self::default()
    }

    /// CSV dialect with defaults.
    pub fn csv() -> Self {
        Self { dialect: Dialect::CsvQuote, ..Self::default() }
    }

    /// Multi-byte delimiter dialect.
    pub fn multi_delim(delimiter: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::MultiDelimFixed,
            delimiter: Some(delimiter.into()),
            ..Self::default()
        }
    }

    /// Check the options against `columns` and produce a configuration.
    pub fn validate(&self, columns: Vec<ColumnSpec>) -> Result<DialectConfig, ConfigError> {
        let terminator = self
            .newline
            .as_deref()
            .map(str::parse::<Terminator>)
            .transpose()?;

        let config = match self.dialect {
            Dialect::TextEscape | Dialect::CsvQuote => self.validate_single_byte(terminator, &columns)?,
            Dialect::MultiDelimFixed => self.validate_multi(terminator, &columns)?,
        };
        Ok(DialectConfig { columns: columns.into(), ..config })
    }

    fn validate_single_byte(
        &self,
        terminator: Option<Terminator>,
        columns: &[ColumnSpec],
    ) -> Result<DialectConfig, ConfigError> {
        let csv = self.dialect == Dialect::CsvQuote;

        let delimiter = match self.delimiter.as_deref() {
            Some(d) if d.eq_ignore_ascii_case("off") => None,
            Some(d) if d.len() != 1 => return Err(ConfigError::DelimiterNotSingleByte),
            Some(d) => Some(d.as_bytes()[0]),
            None if csv => Some(CSV_DEFAULT_DELIMITER.as_bytes()[0]),
            None => Some(TEXT_DEFAULT_DELIMITER.as_bytes()[0]),
        };
        let null_marker = self
            .null_marker
            .clone()
            .unwrap_or_else(|| if csv { CSV_DEFAULT_NULL } else { TEXT_DEFAULT_NULL }.to_string())
            .into_bytes();

        if let Some(d) = delimiter {
            if d == b'\n' || d == b'\r' {
                return Err(ConfigError::DelimiterIsNewline);
            }
            if !csv && TEXT_RESERVED_DELIMITERS.contains(&d) {
                return Err(ConfigError::ReservedDelimiter(d as char));
            }
        }
        if null_marker.iter().any(|&b| b == b'\n' || b == b'\r') {
            return Err(ConfigError::NullMarkerHasNewline);
        }

        let quote = match (csv, self.quote.as_deref()) {
            (false, Some(_)) => return Err(ConfigError::QuoteNotAllowed),
            (false, None) => None,
            (true, None) => Some(CSV_DEFAULT_QUOTE),
            (true, Some(q)) if q.len() != 1 => return Err(ConfigError::QuoteNotSingleByte),
            (true, Some(q)) => Some(q.as_bytes()[0]),
        };
        if let Some(q) = quote {
            if q == b'\n' || q == b'\r' {
                return Err(ConfigError::QuoteIsNewline);
            }
            if delimiter == Some(q) {
                return Err(ConfigError::DelimiterIsQuote);
            }
        }

        let escape = match self.escape.as_deref() {
            Some(e) if !csv && e.eq_ignore_ascii_case("off") => None,
            Some(e) if e.len() != 1 => return Err(ConfigError::EscapeNotSingleByte),
            Some(e) => Some(e.as_bytes()[0]),
            None if csv => quote,
            None => Some(TEXT_DEFAULT_ESCAPE),
        };
        if !csv && matches!(escape, Some(b'\n') | Some(b'\r')) {
            return Err(ConfigError::EscapeIsNewline);
        }

        if let Some(d) = delimiter {
            if null_marker.contains(&d) {
                return Err(ConfigError::DelimiterInNullMarker);
            }
        }
        if let Some(q) = quote {
            if null_marker.contains(&q) {
                return Err(ConfigError::QuoteInNullMarker);
            }
        }
        if !csv {
            if columns.iter().any(|c| c.force_not_null) {
                return Err(ConfigError::ForceNotNullNotCsv);
            }
            if columns.iter().any(|c| c.force_null) {
                return Err(ConfigError::ForceNullNotCsv);
            }
        }

        let end_of_stream = match self.end_of_stream.as_deref() {
            None => Some(DEFAULT_END_OF_STREAM),
            Some(t) if t.eq_ignore_ascii_case("off") => None,
            Some(t) => {
                let bytes: [u8; 2] = t.as_bytes().try_into().map_err(|_| ConfigError::EndOfStreamToken)?;
                Some(bytes)
            }
        };

        Ok(DialectConfig {
            dialect: self.dialect,
            delimiter: delimiter.map(|d| vec![d]),
            terminator,
            quote,
            escape,
            null_marker,
            fill_missing: self.fill_missing,
            header: self.header,
            end_of_stream,
            encoding: self.encoding,
            lenient_newlines: self.lenient_newlines,
            columns: Arc::from(Vec::new()),
        })
    }

    fn validate_multi(
        &self,
        terminator: Option<Terminator>,
        columns: &[ColumnSpec],
    ) -> Result<DialectConfig, ConfigError> {
        let delimiter = match self.delimiter.as_deref() {
            None | Some("") => return Err(ConfigError::MissingDelimiter),
            Some(d) => d.as_bytes().to_vec(),
        };
        if delimiter.iter().any(|&b| b == b'\n' || b == b'\r') {
            return Err(ConfigError::DelimiterIsNewline);
        }
        let quote = match self.quote.as_deref() {
            None => None,
            Some(q) if q.len() != 1 => return Err(ConfigError::QuoteNotSingleByte),
            Some(q) => Some(q.as_bytes()[0]),
        };
        if matches!(quote, Some(b'\n') | Some(b'\r')) {
            return Err(ConfigError::QuoteIsNewline);
        }
        let escape = match self.escape.as_deref() {
            None => quote,
            Some(e) if e.len() != 1 => return Err(ConfigError::EscapeNotSingleByte),
            Some(e) => Some(e.as_bytes()[0]),
        };
        if self.header {
            return Err(ConfigError::HeaderNotSupported);
        }
        if columns.iter().any(|c| c.force_not_null) {
            return Err(ConfigError::ForceNotNullNotCsv);
        }
        if columns.iter().any(|c| c.force_null) {
            return Err(ConfigError::ForceNullNotCsv);
        }

        Ok(DialectConfig {
            dialect: Dialect::MultiDelimFixed,
            delimiter: Some(delimiter),
            terminator: Some(terminator.unwrap_or(Terminator::Lf)),
            quote,
            escape,
            null_marker: Vec::new(),
            fill_missing: false,
            header: false,
            end_of_stream: None,
            encoding: self.encoding,
            lenient_newlines: self.lenient_newlines,
            columns: Arc::from(Vec::new()),
        })
    }
}

/// Validated, immutable dialect configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectConfig {
    dialect: Dialect,
    delimiter: Option<Vec<u8>>,
    terminator: Option<Terminator>,
    quote: Option<u8>,
    escape: Option<u8>,
    null_marker: Vec<u8>,
    fill_missing: bool,
    header: bool,
    end_of_stream: Option<[u8; 2]>,
    encoding: Encoding,
    lenient_newlines: bool,
    columns: Arc<[ColumnSpec]>,
}

impl DialectConfig {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Delimiter token; `None` when the delimiter is off.
    pub fn delimiter(&self) -> Option<&[u8]> {
        self.delimiter.as_deref()
    }

    /// Fixed terminator, or `None` when it is detected from the data.
    pub fn terminator(&self) -> Option<Terminator> {
        self.terminator
    }

    pub fn quote(&self) -> Option<u8> {
        self.quote
    }

    pub fn escape(&self) -> Option<u8> {
        self.escape
    }

    pub fn null_marker(&self) -> &[u8] {
        &self.null_marker
    }

    pub fn fill_missing(&self) -> bool {
        self.fill_missing
    }

    pub fn header(&self) -> bool {
        self.header
    }

    pub fn end_of_stream(&self) -> Option<[u8; 2]> {
        self.end_of_stream
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn lenient_newlines(&self) -> bool {
        self.lenient_newlines
    }

    pub fn columns(&self) -> &Arc<[ColumnSpec]> {
        &self.columns
    }

    /// Shortcut for a stream of `n` untyped columns named `c1..cn`.
    pub fn with_text_columns(options: &DialectOptions, n: usize) -> Result<Self, ConfigError> {
        options.validate((1..=n).map(|i| ColumnSpec::text(format!("c{i}"))).collect())
    }
}
