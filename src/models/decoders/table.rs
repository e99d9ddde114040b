//! Table assembly.
//!
//! [`TableBuilder`] is a [`FieldDecoder`] that parses each field by its
//! column's `ArrowType` hint, plus a collector that turns accepted rows into
//! a `minarrow::Table`. Columns with a hint other than Int32, Int64,
//! Float64 or Boolean are kept as strings.

use std::sync::Arc;

use minarrow::{
    Array, ArrowType, Bitmask, BooleanArray, Field, FieldArray, FloatArray, IntegerArray, NumericArray, StringArray,
    Table, TextArray, Vec64,
};

use crate::error::FieldDecodeError;
use crate::models::decoders::row::Row;
use crate::options::ColumnSpec;
use crate::traits::field_decoder::FieldDecoder;

/// A parsed field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Boolean(bool),
    Utf8(String),
}

#[derive(Debug)]
enum ColumnBuilder {
    Int32(Vec64<i32>),
    Int64(Vec64<i64>),
    Float64(Vec64<f64>),
    Boolean(Vec<bool>),
    Utf8 { offsets: Vec64<u32>, data: Vec64<u8> },
}

impl ColumnBuilder {
    fn for_type(ty: &ArrowType) -> Self {
        match ty {
            ArrowType::Int32 => ColumnBuilder::Int32(Vec64::new()),
            ArrowType::Int64 => ColumnBuilder::Int64(Vec64::new()),
            ArrowType::Float64 => ColumnBuilder::Float64(Vec64::new()),
            ArrowType::Boolean => ColumnBuilder::Boolean(Vec::new()),
            _ => ColumnBuilder::Utf8 { offsets: Vec64::from_slice(&[0u32]), data: Vec64::new() },
        }
    }

    fn dtype(&self) -> ArrowType {
        match self {
            ColumnBuilder::Int32(_) => ArrowType::Int32,
            ColumnBuilder::Int64(_) => ArrowType::Int64,
            ColumnBuilder::Float64(_) => ArrowType::Float64,
            ColumnBuilder::Boolean(_) => ArrowType::Boolean,
            ColumnBuilder::Utf8 { .. } => ArrowType::String,
        }
    }

    /// Append a value, or the type's zero for a null slot.
    fn push(&mut self, value: Option<FieldValue>) -> Result<(), FieldDecodeError> {
        match (self, value) {
            (ColumnBuilder::Int32(v), Some(FieldValue::Int32(x))) => v.push(x),
            (ColumnBuilder::Int32(v), None) => v.push(0),
            (ColumnBuilder::Int64(v), Some(FieldValue::Int64(x))) => v.push(x),
            (ColumnBuilder::Int64(v), None) => v.push(0),
            (ColumnBuilder::Float64(v), Some(FieldValue::Float64(x))) => v.push(x),
            (ColumnBuilder::Float64(v), None) => v.push(0.0),
            (ColumnBuilder::Boolean(v), Some(FieldValue::Boolean(x))) => v.push(x),
            (ColumnBuilder::Boolean(v), None) => v.push(false),
            (ColumnBuilder::Utf8 { offsets, data }, value) => {
                if let Some(FieldValue::Utf8(s)) = &value {
                    data.extend_from_slice(s.as_bytes());
                } else if value.is_some() {
                    return Err(FieldDecodeError::new("value does not match column type"));
                }
                let end = u32::try_from(data.len())
                    .map_err(|_| FieldDecodeError::new("string column exceeds 4 GiB"))?;
                offsets.push(end);
            }
            _ => return Err(FieldDecodeError::new("value does not match column type")),
        }
        Ok(())
    }

    fn finish(self, valid: Vec<bool>, nulls: usize) -> Array {
        let len = valid.len();
        let mask = (nulls > 0).then(|| Bitmask::from_bools(&valid));
        match self {
            ColumnBuilder::Int32(v) => Array::NumericArray(NumericArray::Int32(Arc::new(IntegerArray::from_vec64(v, mask)))),
            ColumnBuilder::Int64(v) => Array::NumericArray(NumericArray::Int64(Arc::new(IntegerArray::from_vec64(v, mask)))),
            ColumnBuilder::Float64(v) => {
                Array::NumericArray(NumericArray::Float64(Arc::new(FloatArray::from_vec64(v, mask))))
            }
            ColumnBuilder::Boolean(v) => Array::BooleanArray(Arc::new(BooleanArray {
                data: Bitmask::from_bools(&v),
                null_mask: mask,
                len,
                _phantom: Default::default(),
            })),
            ColumnBuilder::Utf8 { offsets, data } => Array::TextArray(TextArray::String32(Arc::new(StringArray {
                offsets: offsets.into(),
                data: data.into(),
                null_mask: mask,
            }))),
        }
    }
}

/// Collects decoded rows into a `minarrow::Table`.
#[derive(Debug)]
pub struct TableBuilder {
    columns: Arc<[ColumnSpec]>,
    builders: Vec<ColumnBuilder>,
    valid: Vec<Vec<bool>>,
    nulls: Vec<usize>,
    n_rows: usize,
}

impl TableBuilder {
    pub fn new(columns: Arc<[ColumnSpec]>) -> Self {
        let builders = columns.iter().map(|c| ColumnBuilder::for_type(&c.type_hint)).collect();
        let n = columns.len();
        Self { columns, builders, valid: vec![Vec::new(); n], nulls: vec![0; n], n_rows: 0 }
    }

    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Append a row decoded by this builder.
    pub fn push_row(&mut self, row: Row<FieldValue>) -> Result<(), FieldDecodeError> {
        if row.values.len() != self.builders.len() {
            return Err(FieldDecodeError::new(format!(
                "row has {} values, table has {} columns",
                row.values.len(),
                self.builders.len()
            )));
        }
        for (i, value) in row.values.into_iter().enumerate() {
            let present = value.is_some();
            self.builders[i].push(value)?;
            self.valid[i].push(present);
            if !present {
                self.nulls[i] += 1;
            }
        }
        self.n_rows += 1;
        Ok(())
    }

    pub fn finish(self, name: impl Into<String>) -> Table {
        let cols = self
            .builders
            .into_iter()
            .zip(self.valid)
            .zip(self.nulls)
            .zip(self.columns.iter())
            .map(|(((builder, valid), nulls), column)| {
                let dtype = builder.dtype();
                FieldArray {
                    field: Field {
                        name: column.name.clone(),
                        dtype,
                        nullable: true,
                        metadata: Default::default(),
                    }
                    .into(),
                    array: builder.finish(valid, nulls),
                    null_count: nulls,
                }
            })
            .collect();
        Table { cols, n_rows: self.n_rows, name: name.into() }
    }
}

fn parse_str<'a>(raw: &'a [u8], type_name: &str) -> Result<&'a str, FieldDecodeError> {
    std::str::from_utf8(raw)
        .map_err(|_| FieldDecodeError::new(format!("invalid input syntax for type {type_name}")))
}

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    raw: &[u8],
    type_name: &str,
) -> Result<T, FieldDecodeError> {
    let s = parse_str(raw, type_name)?;
    s.trim().parse::<T>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            FieldDecodeError::new(format!("value \"{s}\" is out of range for type {type_name}"))
        }
        _ => FieldDecodeError::new(format!("invalid input syntax for type {type_name}: \"{s}\"")),
    })
}

fn parse_bool(raw: &[u8]) -> Result<bool, FieldDecodeError> {
    let s = parse_str(raw, "boolean")?;
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(FieldDecodeError::new(format!("invalid input syntax for type boolean: \"{s}\""))),
    }
}

impl FieldDecoder for TableBuilder {
    type Value = FieldValue;

    fn decode(&mut self, column: &ColumnSpec, raw: &[u8]) -> Result<FieldValue, FieldDecodeError> {
        Ok(match column.type_hint {
            ArrowType::Int32 => FieldValue::Int32(parse_int(raw, "integer")?),
            ArrowType::Int64 => FieldValue::Int64(parse_int(raw, "bigint")?),
            ArrowType::Float64 => {
                let s = parse_str(raw, "double precision")?;
                FieldValue::Float64(s.trim().parse().map_err(|_| {
                    FieldDecodeError::new(format!("invalid input syntax for type double precision: \"{s}\""))
                })?)
            }
            ArrowType::Boolean => FieldValue::Boolean(parse_bool(raw)?),
            _ => FieldValue::Utf8(parse_str(raw, "text")?.to_owned()),
        })
    }
}
