//! Row assembly on top of [`RecordDecoder`].
//!
//! Each field of a record is handed to a [`FieldDecoder`]. Nulls become
//! `None`, columns padded in under `fill_missing` take the decoder's
//! default, and conversion failures carry the column, record and offset.

use std::sync::Arc;

use crate::enums::{ParseOutcome, RowOutcome};
use crate::error::{ColumnDecodeError, RowError};
use crate::models::decoders::record::RecordDecoder;
use crate::options::{ColumnSpec, DialectConfig};
use crate::traits::field_decoder::FieldDecoder;
use crate::traits::stream_buffer::StreamBuffer;
use crate::utils::DisplayBytes;

/// One decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<V> {
    /// 1-based record number, header included.
    pub number: u64,
    /// Absolute byte offset of the record.
    pub offset: u64,
    pub values: Vec<Option<V>>,
}

impl<V> Row<V> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Option<V>> {
        self.values
    }
}

pub struct RowAssembler<B: StreamBuffer = Vec<u8>> {
    records: RecordDecoder<B>,
    columns: Arc<[ColumnSpec]>,
}

impl<B: StreamBuffer> RowAssembler<B> {
    pub fn new(config: DialectConfig) -> Self {
        Self::from_decoder(RecordDecoder::new(config))
    }

    pub fn from_decoder(records: RecordDecoder<B>) -> Self {
        let columns = Arc::clone(records.config().columns());
        Self { records, columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        self.records.feed(chunk)
    }

    pub fn at_end_of_input(&mut self) {
        self.records.at_end_of_input()
    }

    pub fn is_finished(&self) -> bool {
        self.records.is_finished()
    }

    pub fn records(&self) -> &RecordDecoder<B> {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut RecordDecoder<B> {
        &mut self.records
    }

    /// Decode the next row. A malformed record or a failed conversion is
    /// an `Err`, after which the assembler continues with the next record.
    pub fn next_row<F: FieldDecoder>(&mut self, decoder: &mut F) -> Result<RowOutcome<F::Value>, RowError> {
        let record = match self.records.next_record() {
            ParseOutcome::Row(record) => record,
            ParseOutcome::NeedMoreInput => return Ok(RowOutcome::NeedMoreInput),
            ParseOutcome::EndOfStream => return Ok(RowOutcome::EndOfStream),
            ParseOutcome::Malformed(m) => return Err(m.into()),
        };

        let mut values = Vec::with_capacity(record.len());
        for (i, (field, column)) in record.iter().zip(self.columns.iter()).enumerate() {
            let value = if field.missing {
                decoder.default_value(column)
            } else if field.is_null {
                None
            } else {
                let decoded = decoder.decode(column, field.bytes).map_err(|source| ColumnDecodeError {
                    column: i,
                    column_name: column.name.clone(),
                    record: record.number(),
                    offset: record.offset(),
                    value: DisplayBytes::new(field.bytes),
                    source,
                })?;
                Some(decoded)
            };
            values.push(value);
        }
        Ok(RowOutcome::Row(Row { number: record.number(), offset: record.offset(), values }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldDecodeError, MalformedReason};
    use crate::options::DialectOptions;
    use crate::traits::field_decoder::Utf8Decoder;

    fn int_decoder() -> impl FnMut(&ColumnSpec, &[u8]) -> Result<i64, FieldDecodeError> {
        |column, raw| {
            std::str::from_utf8(raw).ok().and_then(|s| s.parse().ok()).ok_or_else(|| {
                FieldDecodeError::new(format!("invalid input syntax for integer in {}", column.name))
            })
        }
    }

    #[test]
    fn test_rows_with_nulls() {
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 2).unwrap();
        let mut rows: RowAssembler = RowAssembler::new(config);
        rows.feed(b"1\t\\N\n");
        rows.at_end_of_input();
        let mut dec = int_decoder();
        match rows.next_row(&mut dec).unwrap() {
            RowOutcome::Row(row) => {
                assert_eq!(row.number, 1);
                assert_eq!(row.values, vec![Some(1), None]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rows.next_row(&mut dec).unwrap(), RowOutcome::EndOfStream);
    }

    #[test]
    fn test_decode_error_names_column() {
        let config = DialectOptions::csv()
            .validate(vec![ColumnSpec::text("id"), ColumnSpec::text("qty")])
            .unwrap();
        let mut rows: RowAssembler = RowAssembler::new(config);
        rows.feed(b"1,2\n3,x\n4,5\n");
        let mut dec = int_decoder();
        assert!(matches!(rows.next_row(&mut dec), Ok(RowOutcome::Row(_))));
        let err = rows.next_row(&mut dec).unwrap_err();
        assert_eq!(err.column_name(), Some("qty"));
        assert_eq!(err.record(), 2);
        assert_eq!(err.offset(), 4);
        match rows.next_row(&mut dec).unwrap() {
            RowOutcome::Row(row) => assert_eq!(row.values, vec![Some(4), Some(5)]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rows.next_row(&mut dec).unwrap(), RowOutcome::NeedMoreInput);
    }

    #[test]
    fn test_missing_columns_use_default() {
        struct WithDefault;
        impl FieldDecoder for WithDefault {
            type Value = String;
            fn decode(&mut self, _: &ColumnSpec, raw: &[u8]) -> Result<String, FieldDecodeError> {
                Ok(String::from_utf8_lossy(raw).into_owned())
            }
            fn default_value(&mut self, column: &ColumnSpec) -> Option<String> {
                Some(format!("default-{}", column.name))
            }
        }
        let opts = DialectOptions { fill_missing: true, ..DialectOptions::text() };
        let mut rows: RowAssembler = RowAssembler::new(DialectConfig::with_text_columns(&opts, 3).unwrap());
        rows.feed(b"a\n");
        match rows.next_row(&mut WithDefault).unwrap() {
            RowOutcome::Row(row) => assert_eq!(
                row.values,
                vec![Some("a".to_string()), Some("default-c2".to_string()), Some("default-c3".to_string())]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_record_surfaces() {
        let config = DialectConfig::with_text_columns(&DialectOptions::csv(), 1).unwrap();
        let mut rows: RowAssembler = RowAssembler::new(config);
        rows.feed(b"\"open");
        rows.at_end_of_input();
        match rows.next_row(&mut Utf8Decoder) {
            Err(RowError::Malformed(m)) => assert_eq!(m.reason, MalformedReason::UnterminatedQuote),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rows.next_row(&mut Utf8Decoder).unwrap(), RowOutcome::EndOfStream);
    }
}
