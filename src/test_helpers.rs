//! # Test Helpers - *Fixtures for decoder and writer tests*
//!
//! Deterministic `minarrow` columns, chunking utilities and a record
//! collector that drives a [`RecordDecoder`] through arbitrary chunk
//! boundaries.

use std::io::Write;
use std::sync::Arc;

use minarrow::{
    Array, ArrowType, Bitmask, BooleanArray, Buffer, Field, FieldArray, IntegerArray, NumericArray, StringArray,
    Table, TextArray, Vec64,
};
use tempfile::NamedTempFile;

use crate::enums::ParseOutcome;
use crate::error::MalformedReason;
use crate::models::decoders::record::RecordDecoder;
use crate::options::DialectConfig;

// -------------------- Column Generators -------------------- //

/// Build a non-nullable `Int32` column named `name`.
pub(crate) fn int32_col(name: &str, values: &[i32]) -> FieldArray {
    FieldArray::new(
        Field {
            name: name.into(),
            dtype: ArrowType::Int32,
            nullable: false,
            metadata: Default::default(),
        },
        Array::NumericArray(NumericArray::Int32(Arc::new(IntegerArray {
            data: Buffer::from(Vec64::from_slice(values)),
            null_mask: None,
        }))),
    )
}

/// Build a nullable `Boolean` column of four values `[true, false, true, true]`.
pub(crate) fn bool_col(name: &str) -> FieldArray {
    FieldArray::new(
        Field {
            name: name.into(),
            dtype: ArrowType::Boolean,
            nullable: true,
            metadata: Default::default(),
        },
        Array::BooleanArray(Arc::new(BooleanArray {
            data: Bitmask::from_bytes(&[0b0000_1101], 4),
            null_mask: Some(Bitmask::new_set_all(4, true)),
            len: 4,
            _phantom: std::marker::PhantomData,
        })),
    )
}

/// Build a nullable `String32` column; `None` entries are null.
pub(crate) fn string32_col(name: &str, values: &[Option<&str>]) -> FieldArray {
    let mut offsets = vec![0u32];
    let mut data = Vec::new();
    for v in values {
        data.extend_from_slice(v.unwrap_or_default().as_bytes());
        offsets.push(data.len() as u32);
    }
    let valid: Vec<bool> = values.iter().map(Option::is_some).collect();
    FieldArray::new(
        Field {
            name: name.into(),
            dtype: ArrowType::String,
            nullable: true,
            metadata: Default::default(),
        },
        Array::TextArray(TextArray::String32(Arc::new(StringArray::new(
            Buffer::from(Vec64::from_slice(&data)),
            Some(Bitmask::from_bools(&valid)),
            Buffer::from(Vec64::from_slice(&offsets)),
        )))),
    )
}

pub(crate) fn make_table(name: &str, n_rows: usize, cols: Vec<FieldArray>) -> Table {
    Table { cols, n_rows, name: name.to_owned() }
}

// -------------------- Chunking -------------------- //

/// Split `data` into chunks of the given sizes, cycling through `sizes`.
pub(crate) fn chunked(data: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    while pos < data.len() {
        let n = sizes[i % sizes.len()].max(1).min(data.len() - pos);
        out.push(data[pos..pos + n].to_vec());
        pos += n;
        i += 1;
    }
    out
}

pub(crate) type Collected = Vec<Result<Vec<Option<Vec<u8>>>, MalformedReason>>;

/// Feed `chunks` one at a time, draining every record in between, and
/// collect the outcomes in order.
pub(crate) fn collect_records(config: DialectConfig, chunks: &[Vec<u8>]) -> Collected {
    let mut decoder: RecordDecoder = RecordDecoder::new(config);
    let mut out = Vec::new();
    let mut chunks = chunks.iter();
    loop {
        match decoder.next_record() {
            ParseOutcome::Row(r) => out.push(Ok(r.to_owned_fields())),
            ParseOutcome::Malformed(m) => out.push(Err(m.reason)),
            ParseOutcome::EndOfStream => return out,
            ParseOutcome::NeedMoreInput => match chunks.next() {
                Some(chunk) => {
                    decoder.feed(chunk);
                }
                None => decoder.at_end_of_input(),
            },
        }
    }
}

/// Shorthand for an expected non-null field.
pub(crate) fn f(v: &str) -> Option<Vec<u8>> {
    Some(v.as_bytes().to_vec())
}

// -------------------- File Writers -------------------- //

/// Write `bytes` to a temporary file and return the handle.
pub(crate) fn write_temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut temp = NamedTempFile::new().expect("Failed to create NamedTempFile");
    temp.write_all(bytes).expect("Failed to write temp file");
    temp.flush().expect("Failed to flush temp file");
    temp
}
