//! TEXT dialect field splitter.
//!
//! Fields are separated by a single-byte delimiter. The escape byte
//! (default `\`) introduces:
//! - `\b \f \n \r \t \v`: the matching control byte
//! - `\ooo`: one to three octal digits
//! - `\xhh`: one or two hex digits
//! - anything else: that byte literally
//!
//! The null marker is compared against the raw, pre-escape bytes, so an
//! escaped `\\N` is the two-character string `\N` and not a null.
//!
//! Lines left in an encoding whose trailing bytes can look like ASCII
//! (SJIS, GBK, ...) are walked one character at a time, so a trailing byte
//! is never read as a delimiter or escape.

use crate::enums::Encoding;
use crate::error::MalformedReason;
use crate::models::splitters::arena::FieldArena;
use crate::traits::record_dialect::SplitEnd;
use crate::utils::is_valid_utf8;

#[derive(Debug, Clone)]
pub struct TextSplitter {
    delimiter: Option<u8>,
    escape: Option<u8>,
    null_marker: Vec<u8>,
    encoding: Encoding,
}

#[inline]
fn octal_value(c: u8) -> Option<u8> {
    (b'0'..=b'7').contains(&c).then(|| c - b'0')
}

#[inline]
fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

impl TextSplitter {
    pub fn new(delimiter: Option<u8>, escape: Option<u8>, null_marker: Vec<u8>) -> Self {
        Self { delimiter, escape, null_marker, encoding: Encoding::Utf8 }
    }

    /// Encoding of the lines handed to [`split`](Self::split).
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Copy the rest of the character led by `lead`, already pushed.
    #[inline]
    fn push_trail(&self, line: &[u8], cur: &mut usize, lead: u8, arena: &mut FieldArena) {
        if self.encoding.embeds_ascii() && lead >= 0x80 {
            let end = (*cur + self.encoding.char_len(lead) - 1).min(line.len());
            arena.extend(&line[*cur..end]);
            *cur = end;
        }
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
            let mut saw_non_ascii = false;
            let mut raw_end;

            // Scan to the end of the field, de-escaping speculatively. No
            // errors may be raised until the null-marker check is done.
            loop {
                raw_end = cur;
                if cur >= end {
                    break;
                }
                let mut c = line[cur];
                cur += 1;
                if Some(c) == self.delimiter {
                    found_delim = true;
                    break;
                }
                if Some(c) == self.escape {
                    if cur >= end {
                        break;
                    }
                    c = line[cur];
                    cur += 1;
                    match c {
                        b'0'..=b'7' => {
                            let mut val = u32::from(c - b'0');
                            for _ in 0..2 {
                                match line.get(cur).copied().and_then(octal_value) {
                                    Some(d) => {
                                        val = (val << 3) + u32::from(d);
                                        cur += 1;
                                    }
                                    None => break,
                                }
                            }
                            c = (val & 0xff) as u8;
                            saw_non_ascii |= c == 0 || c >= 0x80;
                        }
                        b'x' => {
                            if let Some(h) = line.get(cur).copied().and_then(hex_value) {
                                let mut val = h;
                                cur += 1;
                                if let Some(l) = line.get(cur).copied().and_then(hex_value) {
                                    val = (val << 4) + l;
                                    cur += 1;
                                }
                                c = val;
                                saw_non_ascii |= c == 0 || c >= 0x80;
                            }
                        }
                        b'b' => c = 0x08,
                        b'f' => c = 0x0c,
                        b'n' => c = b'\n',
                        b'r' => c = b'\r',
                        b't' => c = b'\t',
                        b'v' => c = 0x0b,
                        _ => {
                            arena.push(c);
                            self.push_trail(line, &mut cur, c, arena);
                            continue;
                        }
                    }
                    arena.push(c);
                    continue;
                }
                arena.push(c);
                self.push_trail(line, &mut cur, c, arena);
            }

            let raw = &line[start..raw_end];
            let is_null = raw == self.null_marker.as_slice();
            // escapes can spell any byte; the result must still be a valid string
            if !is_null && saw_non_ascii {
                let value = arena.pending(out);
                let checked = self.encoding == Encoding::Utf8;
                if value.contains(&0) || (checked && !is_valid_utf8(value)) {
                    return Err(MalformedReason::InvalidEncoding(self.encoding.name()));
                }
            }
            arena.finish_field(out, is_null, false);
            fieldno += 1;

            if !found_delim {
                *cursor = cur;
                return Ok(SplitEnd { fields: fieldno, stopped_at_delimiter: false });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &[u8]) -> Vec<Option<Vec<u8>>> {
        let splitter = TextSplitter::new(Some(b'\t'), Some(b'\\'), b"\\N".to_vec());
        let mut arena = FieldArena::new();
        let mut cursor = 0;
        splitter.split(line, &mut cursor, None, &mut arena).unwrap();
        (0..arena.len())
            .map(|i| arena.field(i).unwrap().value().map(<[u8]>::to_vec))
            .collect()
    }

    #[test]
    fn test_plain_fields_and_null() {
        assert_eq!(
            split(b"1\t\\N\tabc"),
            vec![Some(b"1".to_vec()), None, Some(b"abc".to_vec())]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(split(b"a\\tb"), vec![Some(b"a\tb".to_vec())]);
        assert_eq!(split(b"\\101\\x41\\x4"), vec![Some(b"AA\x04".to_vec())]);
        assert_eq!(split(b"\\n\\r\\b\\f\\v"), vec![Some(b"\n\r\x08\x0c\x0b".to_vec())]);
        assert_eq!(split(b"\\\\N"), vec![Some(b"\\N".to_vec())]);
        assert_eq!(split(b"a\\\tb"), vec![Some(b"a\tb".to_vec())]);
        // \x with no hex digits keeps the letter
        assert_eq!(split(b"\\xg"), vec![Some(b"xg".to_vec())]);
        // trailing escape is dropped
        assert_eq!(split(b"ab\\"), vec![Some(b"ab".to_vec())]);
    }

    #[test]
    fn test_empty_line_is_one_empty_field() {
        assert_eq!(split(b""), vec![Some(Vec::new())]);
        assert_eq!(split(b"\t"), vec![Some(Vec::new()), Some(Vec::new())]);
    }

    #[test]
    fn test_escaped_bytes_must_be_valid_utf8() {
        let splitter = TextSplitter::new(Some(b'\t'), Some(b'\\'), b"\\N".to_vec());
        let mut arena = FieldArena::new();
        let mut cursor = 0;
        assert_eq!(
            splitter.split(b"\\xff", &mut cursor, None, &mut arena),
            Err(MalformedReason::InvalidEncoding("UTF8"))
        );
        arena.clear();
        cursor = 0;
        assert!(splitter.split(b"\\303\\251", &mut cursor, None, &mut arena).is_ok());
        assert_eq!(arena.field(0).unwrap().bytes, "é".as_bytes());
        arena.clear();
        cursor = 0;
        assert!(splitter.split(b"\\0", &mut cursor, None, &mut arena).is_err());
    }

    #[test]
    fn test_stop_and_resume() {
        let splitter = TextSplitter::new(Some(b','), Some(b'\\'), b"\\N".to_vec());
        let mut arena = FieldArena::new();
        let mut cursor = 0;
        let first = splitter.split(b"a,b,c", &mut cursor, Some(2), &mut arena).unwrap();
        assert_eq!(first, SplitEnd { fields: 2, stopped_at_delimiter: true });
        assert_eq!(cursor, 4);
        let rest = splitter.split(b"a,b,c", &mut cursor, None, &mut arena).unwrap();
        assert_eq!(rest.fields, 1);
        assert_eq!(arena.field(2).unwrap().bytes, b"c");
    }

    #[test]
    fn test_delimiter_and_escape_off() {
        let whole = TextSplitter::new(None, Some(b'\\'), b"\\N".to_vec());
        let mut arena = FieldArena::new();
        let mut cursor = 0;
        whole.split(b"a\tb", &mut cursor, None, &mut arena).unwrap();
        assert_eq!(arena.len(), 1);

        let verbatim = TextSplitter::new(Some(b'\t'), None, b"\\N".to_vec());
        arena.clear();
        cursor = 0;
        verbatim.split(b"a\\tb", &mut cursor, None, &mut arena).unwrap();
        assert_eq!(arena.field(0).unwrap().bytes, b"a\\tb");
    }

    #[test]
    fn test_sjis_trailing_bytes_are_not_syntax() {
        // 0x83 0x5C is one character whose second byte is a backslash
        let splitter =
            TextSplitter::new(Some(b'\t'), Some(b'\\'), b"\\N".to_vec()).with_encoding(Encoding::Sjis);
        let mut arena = FieldArena::new();
        let mut cursor = 0;
        let end = splitter.split(b"\x83\x5c\tb\t\\\x83\x5c", &mut cursor, None, &mut arena).unwrap();
        assert_eq!(end.fields, 3);
        assert_eq!(arena.field(0).unwrap().bytes, b"\x83\x5c");
        assert_eq!(arena.field(1).unwrap().bytes, b"b");
        assert_eq!(arena.field(2).unwrap().bytes, b"\x83\x5c");

        // escaped high bytes are not held to UTF-8 rules here
        arena.clear();
        cursor = 0;
        assert!(splitter.split(b"\\xff", &mut cursor, None, &mut arena).is_ok());
        arena.clear();
        cursor = 0;
        assert_eq!(
            splitter.split(b"\\x00\\x83", &mut cursor, None, &mut arena),
            Err(MalformedReason::InvalidEncoding("SJIS"))
        );
    }
}
