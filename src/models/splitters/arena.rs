//! Per-record scratch storage for de-escaped fields.
//!
//! The arena is cleared (not freed) before each record, so steady-state
//! splitting does not allocate. A [`Record`] borrows it until the decoder is
//! used again.

use std::ops::Range;

/// Location of one field inside the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpan {
    pub range: Range<usize>,
    pub is_null: bool,
    /// At least one quote character appeared in the raw field (CSV).
    pub quoted: bool,
    /// Padded in under `fill_missing`; the row layer substitutes a default.
    pub missing: bool,
}

/// Growable backing store for one record's fields.
#[derive(Debug, Default)]
pub struct FieldArena {
    bytes: Vec<u8>,
    spans: Vec<FieldSpan>,
}

impl FieldArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize, fields: usize) -> Self {
        Self { bytes: Vec::with_capacity(bytes), spans: Vec::with_capacity(fields) }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.spans.clear();
    }

    /// Output position where the next field's bytes start.
    #[inline]
    pub fn mark(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn push(&mut self, b: u8) {
        self.bytes.push(b);
    }

    #[inline]
    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Close the field whose bytes started at `start`.
    pub fn finish_field(&mut self, start: usize, is_null: bool, quoted: bool) {
        if is_null {
            // null fields keep no payload
            self.bytes.truncate(start);
        }
        let end = self.bytes.len();
        self.spans.push(FieldSpan { range: start..end, is_null, quoted, missing: false });
    }

    /// Append a null placeholder for a column the line did not supply.
    pub fn push_missing(&mut self) {
        let at = self.bytes.len();
        self.spans.push(FieldSpan { range: at..at, is_null: true, quoted: false, missing: true });
    }

    /// Bytes of the field being built, from `start` to the current end.
    #[inline]
    pub fn pending(&self, start: usize) -> &[u8] {
        &self.bytes[start..]
    }

    pub fn set_null(&mut self, index: usize) {
        if let Some(span) = self.spans.get_mut(index) {
            span.is_null = true;
            span.range.end = span.range.start;
        }
    }

    /// Replace field `index` with `value` as a non-null field.
    pub fn replace(&mut self, index: usize, value: &[u8]) {
        let start = self.bytes.len();
        self.bytes.extend_from_slice(value);
        let end = self.bytes.len();
        if let Some(span) = self.spans.get_mut(index) {
            span.range = start..end;
            span.is_null = false;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[FieldSpan] {
        &self.spans
    }

    pub fn field(&self, index: usize) -> Option<RawField<'_>> {
        self.spans.get(index).map(|s| RawField {
            bytes: &self.bytes[s.range.clone()],
            is_null: s.is_null,
            missing: s.missing,
        })
    }
}

/// One field of a decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawField<'a> {
    pub bytes: &'a [u8],
    pub is_null: bool,
    pub missing: bool,
}

impl<'a> RawField<'a> {
    /// Field bytes, or `None` when null.
    pub fn value(&self) -> Option<&'a [u8]> {
        (!self.is_null).then_some(self.bytes)
    }
}

/// A framed and split record, borrowed from the decoder.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    arena: &'a FieldArena,
    number: u64,
    offset: u64,
}

impl<'a> Record<'a> {
    pub(crate) fn new(arena: &'a FieldArena, number: u64, offset: u64) -> Self {
        Self { arena, number, offset }
    }

    /// 1-based position of the record in the stream, header included.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Absolute byte offset of the record's first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RawField<'a>> {
        self.arena.field(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = RawField<'a>> + 'a {
        let arena = self.arena;
        (0..arena.len()).filter_map(move |i| arena.field(i))
    }

    /// Copy the fields out so they outlive the decoder borrow.
    pub fn to_owned_fields(&self) -> Vec<Option<Vec<u8>>> {
        self.iter().map(|f| f.value().map(<[u8]>::to_vec)).collect()
    }
}
