//! CSV dialect field splitter.
//!
//! A field toggles between unquoted and quoted mode on each quote byte.
//! Inside quotes, the escape byte followed by an escape or quote yields that
//! byte literally. When escape and quote are the same byte (the default),
//! `""` therefore reads as one `"`.
//!
//! Only a field that never contained a quote can match the null marker, so
//! `""` under the default empty null marker is an empty string, not null.
//!
//! As in the TEXT splitter, multi-byte characters of ASCII-embedding
//! encodings are copied whole.

use crate::enums::Encoding;
use crate::error::MalformedReason;
use crate::models::splitters::arena::FieldArena;
use crate::traits::record_dialect::SplitEnd;

#[derive(Debug, Clone)]
pub struct CsvSplitter {
    delimiter: Option<u8>,
    quote: u8,
    escape: u8,
    null_marker: Vec<u8>,
    encoding: Encoding,
}

impl CsvSplitter {
    pub fn new(delimiter: Option<u8>, quote: u8, escape: u8, null_marker: Vec<u8>) -> Self {
        Self { delimiter, quote, escape, null_marker, encoding: Encoding::Utf8 }
    }

    /// Encoding of the lines handed to [`split`](Self::split).
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Number of trailing bytes that belong to the character led by `c`.
    #[inline]
    fn trail_len(&self, c: u8) -> usize {
        if self.encoding.embeds_ascii() && c >= 0x80 { self.encoding.char_len(c) - 1 } else { 0 }
    }

    pub fn split(
        &self,
        line: &[u8],
        cursor: &mut usize,
        stop_at_field: Option<usize>,
        arena: &mut FieldArena,
    ) -> Result<SplitEnd, MalformedReason> {
        let mut cur = *cursor;
        let end = line.len();
        let mut fieldno = 0usize;

        loop {
            if stop_at_field == Some(fieldno) {
                *cursor = cur;
                return Ok(SplitEnd { fields: fieldno, stopped_at_delimiter: true });
            }

            let start = cur;
            let out = arena.mark();
            let mut found_delim = false;
            let mut saw_quote = false;
            let raw_end;

            'field: loop {
                // not in quote
                loop {
                    if cur >= end {
                        raw_end = cur;
                        break 'field;
                    }
                    let c = line[cur];
                    cur += 1;
                    if Some(c) == self.delimiter {
                        raw_end = cur - 1;
                        found_delim = true;
                        break 'field;
                    }
                    if c == self.quote {
                        saw_quote = true;
                        break;
                    }
                    arena.push(c);
                    let trail = (cur + self.trail_len(c)).min(end);
                    arena.extend(&line[cur..trail]);
                    cur = trail;
                }

                // in quote
                loop {
                    if cur >= end {
                        return Err(MalformedReason::UnterminatedQuote);
                    }
                    let c = line[cur];
                    cur += 1;
                    if c == self.escape {
                        if let Some(&next) = line.get(cur) {
                            if next == self.escape || next == self.quote {
                                arena.push(next);
                                cur += 1;
                                continue;
                            }
                        }
                    }
                    // tested after the escape so quote == escape still closes
                    if c == self.quote {
                        break;
                    }
                    arena.push(c);
                    let trail = (cur + self.trail_len(c)).min(end);
                    arena.extend(&line[cur..trail]);
                    cur = trail;
                }
            }

            let is_null = !saw_quote && &line[start..raw_end] == self.null_marker.as_slice();
            arena.finish_field(out, is_null, saw_quote);
            fieldno += 1;

            if !found_delim {
                *cursor = cur;
                return Ok(SplitEnd { fields: fieldno, stopped_at_delimiter: false });
            }
        }
    }
}
