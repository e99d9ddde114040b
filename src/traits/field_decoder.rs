//! Injected per-field conversion.
//!
//! The codec hands each non-null field's bytes to a [`FieldDecoder`] along
//! with its column, and attributes any failure to that column and record.

use crate::error::FieldDecodeError;
use crate::options::ColumnSpec;

pub trait FieldDecoder {
    type Value;

    /// Convert one non-null field.
    fn decode(&mut self, column: &ColumnSpec, raw: &[u8]) -> Result<Self::Value, FieldDecodeError>;

    /// Value for a column the line did not supply under `fill_missing`.
    /// `None` is null.
    fn default_value(&mut self, _column: &ColumnSpec) -> Option<Self::Value> {
        None
    }
}

impl<V, F> FieldDecoder for F
where
    F: FnMut(&ColumnSpec, &[u8]) -> Result<V, FieldDecodeError>,
{
    type Value = V;

    fn decode(&mut self, column: &ColumnSpec, raw: &[u8]) -> Result<V, FieldDecodeError> {
        self(column, raw)
    }
}

/// Keeps fields as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl FieldDecoder for BytesDecoder {
    type Value = Vec<u8>;

    fn decode(&mut self, _column: &ColumnSpec, raw: &[u8]) -> Result<Vec<u8>, FieldDecodeError> {
        Ok(raw.to_vec())
    }
}

/// Fields as `String`, rejecting invalid UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder;

impl FieldDecoder for Utf8Decoder {
    type Value = String;

    fn decode(&mut self, _column: &ColumnSpec, raw: &[u8]) -> Result<String, FieldDecodeError> {
        String::from_utf8(raw.to_vec())
            .map_err(|_| FieldDecodeError::new("invalid byte sequence for encoding \"UTF8\""))
    }
}
