//! # Multi-byte delimiter scanner
//!
//! Frames rows whose delimiter and terminator are arbitrary byte strings.
//!
//! ## Overview
//! - A token counts only when it is preceded by an even number of escape bytes.
//! - With a quote configured, every field is quoted. The scanner then looks
//!   for `quote + token` instead of the bare token, so tokens inside quoted
//!   data are skipped.
//! - `quote + terminator` right after `quote + delimiter` (or at the row
//!   start) could be a field that begins with a newline. In that case the
//!   whole row is validated column by column before the record is accepted.
//! - The column count is fixed, so a short or long row is malformed.

use tracing::trace;

use crate::enums::{FrameStep, Terminator};
use crate::error::MalformedReason;
use crate::models::buffers::ring_buffer::ScanWindow;
use crate::models::splitters::arena::FieldArena;
use crate::models::splitters::multi_delim::unpack_delimited;
use crate::traits::record_dialect::SplitEnd;
use crate::utils::{count_preceding, find_subslice};

/// Delimiter, terminator, quote and escape of a multi-delim stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiDelimTokens {
    pub delimiter: Vec<u8>,
    pub eol: Vec<u8>,
    pub quote: Option<u8>,
    pub escape: Option<u8>,
    pub columns: usize,
    quote_delimiter: Vec<u8>,
    quote_eol: Vec<u8>,
}

impl MultiDelimTokens {
    pub fn new(
        delimiter: &[u8],
        terminator: Terminator,
        quote: Option<u8>,
        escape: Option<u8>,
        columns: usize,
    ) -> Self {
        let eol = terminator.as_bytes().to_vec();
        let prefixed = |token: &[u8]| match quote {
            Some(q) => {
                let mut v = Vec::with_capacity(token.len() + 1);
                v.push(q);
                v.extend_from_slice(token);
                v
            }
            None => token.to_vec(),
        };
        Self {
            quote_delimiter: prefixed(delimiter),
            quote_eol: prefixed(&eol),
            delimiter: delimiter.to_vec(),
            eol,
            quote,
            escape,
            columns,
        }
    }

    /// Start of the first unescaped delimiter at or after `from`. With a
    /// quote this is the position of the closing quote before it.
    pub fn find_delimiter(&self, window: &[u8], from: usize) -> Option<usize> {
        find_first_unescaped(window, &self.quote_delimiter, self.escape, from)
    }

    /// Start of the first unescaped terminator at or after `from`. With a
    /// quote this is just past the closing quote.
    pub fn find_eol(&self, window: &[u8], from: usize) -> Option<usize> {
        let found = find_first_unescaped(window, &self.quote_eol, self.escape, from)?;
        Some(if self.quote.is_some() { found + 1 } else { found })
    }

    fn eol_search_len(&self) -> usize {
        self.quote_eol.len()
    }
}

/// First occurrence of `target` in `window[from..]` that is preceded by an
/// even number of `escape` bytes. Escapes are counted back to the window
/// start at most.
pub fn find_first_unescaped(window: &[u8], target: &[u8], escape: Option<u8>, from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let p = find_subslice(window, target, pos)?;
        let escaped = escape.is_some_and(|e| count_preceding(window, p, e) % 2 == 1);
        if !escaped {
            return Some(p);
        }
        pos = p + target.len();
    }
}

/// Outcome of validating a whole quoted row.
#[derive(Debug, PartialEq, Eq)]
enum WholeLine {
    /// Terminator starts here.
    Complete(usize),
    /// Ran off the end of the buffered bytes. The check resumes from here.
    Incomplete(WholeLineCursor),
    Invalid,
}

/// Progress of the whole-row check, relative to the record start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WholeLineCursor {
    column: usize,
    pos: usize,
    /// `pos` lies inside the column's quotes.
    inside: bool,
}

#[derive(Debug, Clone)]
pub struct MultiDelimScanner {
    tokens: MultiDelimTokens,
    // absolute index where the next terminator search resumes
    scan_from: usize,
    whole_line: WholeLineCursor,
    saw_eol: bool,
    saw_delim: bool,
}

impl MultiDelimScanner {
    pub fn new(tokens: MultiDelimTokens) -> Self {
        Self { tokens, scan_from: 0, whole_line: WholeLineCursor::default(), saw_eol: false, saw_delim: false }
    }

    pub fn tokens(&self) -> &MultiDelimTokens {
        &self.tokens
    }

    pub fn rebase(&mut self, shift: usize) {
        self.scan_from = self.scan_from.saturating_sub(shift);
    }

    /// Every column of the row is checked: opening quote, unescaped closing
    /// quote, then a delimiter, or the terminator after the last column.
    fn find_whole_line(&self, data: &[u8], quote: u8, from: WholeLineCursor) -> WholeLine {
        let t = &self.tokens;
        let n = data.len();
        let WholeLineCursor { mut column, pos: mut p, mut inside } = from;

        while column < t.columns {
            if !inside {
                if p >= n {
                    return WholeLine::Incomplete(WholeLineCursor { column, pos: p, inside: false });
                }
                if data[p] != quote {
                    return WholeLine::Invalid;
                }
                p += 1;
                inside = true;
            }
            loop {
                while p < n && data[p] != quote {
                    p += 1;
                }
                if p >= n {
                    return WholeLine::Incomplete(WholeLineCursor { column, pos: p, inside });
                }
                match t.escape {
                    // doubled quotes: only the odd one out of a run closes
                    Some(e) if e == quote => {
                        let run = data[p..].iter().take_while(|&&b| b == quote).count();
                        if p + run >= n {
                            return WholeLine::Incomplete(WholeLineCursor { column, pos: p, inside });
                        }
                        if run % 2 == 0 {
                            p += run;
                            continue;
                        }
                        p += run - 1;
                    }
                    Some(e) if count_preceding(data, p, e) % 2 == 1 => {
                        p += 1;
                        continue;
                    }
                    _ => {}
                }
                break;
            }

            // `p` is the closing quote
            let closing = WholeLineCursor { column, pos: p, inside };
            let token: &[u8] = if column + 1 == t.columns { &t.eol } else { &t.delimiter };
            if p + 1 + token.len() > n {
                return WholeLine::Incomplete(closing);
            }
            if data[p + 1..p + 1 + token.len()] != token[..] {
                return WholeLine::Invalid;
            }
            if column + 1 == t.columns {
                return WholeLine::Complete(p + 1);
            }
            p += 1 + token.len();
            column += 1;
            inside = false;
        }
        WholeLine::Invalid
    }

    fn eof_error(&mut self, start: usize, len: usize) -> FrameStep {
        let reason = match self.tokens.quote {
            Some(_) if !self.saw_eol => MalformedReason::MissingQuotedToken("newline"),
            Some(_) if !self.saw_delim && self.tokens.columns > 1 => {
                MalformedReason::MissingQuotedToken("delimiter")
            }
            _ => MalformedReason::UnexpectedEof,
        };
        self.scan_from = len;
        self.whole_line = WholeLineCursor::default();
        FrameStep::Malformed { reason, start, next: len }
    }

    pub fn find_record_end(&mut self, w: &ScanWindow<'_>, start: usize) -> FrameStep {
        let len = w.len();
        if start >= len {
            return if w.at_eof() {
                FrameStep::EndOfStream { pending: None, next: len }
            } else {
                FrameStep::NeedMore
            };
        }
        let data = &w.bytes()[start..];
        let from = self.scan_from.saturating_sub(start).min(data.len());

        let Some(mut border) = self.tokens.find_eol(data, from) else {
            if !w.at_eof() {
                // a token may straddle the chunk boundary
                let keep = self.tokens.eol_search_len().saturating_sub(1);
                self.scan_from = start + data.len().saturating_sub(keep);
                return FrameStep::NeedMore;
            }
            return self.eof_error(start, len);
        };
        self.saw_eol = true;
        let eol_len = self.tokens.eol.len();

        if let Some(quote) = self.tokens.quote {
            let dlen = self.tokens.delimiter.len();
            let ambiguous = border == 1
                || (border > dlen && data[border - 1 - dlen..border - 1] == self.tokens.delimiter[..]);
            if ambiguous {
                match self.find_whole_line(data, quote, self.whole_line) {
                    WholeLine::Complete(p) => border = p,
                    WholeLine::Incomplete(resume) if !w.at_eof() => {
                        // the next call finds the same `quote + terminator` first
                        self.whole_line = resume;
                        self.scan_from = start + border - 1;
                        return FrameStep::NeedMore;
                    }
                    WholeLine::Incomplete(_) | WholeLine::Invalid => {
                        self.whole_line = WholeLineCursor::default();
                        self.saw_eol = false;
                        let next = start + border + eol_len;
                        self.scan_from = next;
                        return FrameStep::Malformed { reason: MalformedReason::IncompleteRow, start, next };
                    }
                }
            }
        }

        let end = start + border;
        let next = end + eol_len;
        self.scan_from = next;
        self.whole_line = WholeLineCursor::default();
        trace!(start, end, "framed multi-delimited row");
        FrameStep::Record { start, end, next }
    }

    pub fn split(
        &mut self,
        line: &[u8],
        cursor: &mut usize,
        arena: &mut FieldArena,
    ) -> Result<SplitEnd, MalformedReason> {
        let row = &line[*cursor..];
        let (fields, saw_delim) = unpack_delimited(&self.tokens, row, arena)?;
        self.saw_delim |= saw_delim;
        *cursor = line.len();
        Ok(SplitEnd { fields, stopped_at_delimiter: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(scanner: &mut MultiDelimScanner, data: &[u8]) -> Vec<FrameStep> {
        let mut padded = data.to_vec();
        padded.push(0);
        let w = ScanWindow::over(&padded, data.len(), true);
        let mut start = 0;
        let mut out = Vec::new();
        loop {
            let step = scanner.find_record_end(&w, start);
            match &step {
                FrameStep::Record { next, .. } | FrameStep::Malformed { next, .. } => start = *next,
                _ => {
                    out.push(step);
                    return out;
                }
            }
            out.push(step);
        }
    }

    #[test]
    fn test_find_first_unescaped() {
        assert_eq!(find_first_unescaped(b"a\\;;b;;c", b";;", Some(b'\\'), 0), Some(5));
        assert_eq!(find_first_unescaped(b"a\\\\;;b", b";;", Some(b'\\'), 0), Some(3));
        assert_eq!(find_first_unescaped(b"abc", b";;", Some(b'\\'), 0), None);
        assert_eq!(find_first_unescaped(b"a;;b", b";;", None, 2), None);
    }

    #[test]
    fn test_unquoted_rows() {
        let tokens = MultiDelimTokens::new(b";;", Terminator::Lf, None, Some(b'\\'), 2);
        let mut s = MultiDelimScanner::new(tokens);
        let steps = scan_all(&mut s, b"a;;b\nc\\\n;;d\n");
        assert_eq!(steps[0], FrameStep::Record { start: 0, end: 4, next: 5 });
        assert_eq!(steps[1], FrameStep::Record { start: 5, end: 11, next: 12 });
        assert_eq!(steps[2], FrameStep::EndOfStream { pending: None, next: 12 });
    }

    #[test]
    fn test_quoted_rows_skip_inner_newlines() {
        let tokens = MultiDelimTokens::new(b"|~|", Terminator::Lf, Some(b'"'), Some(b'\\'), 2);
        let mut s = MultiDelimScanner::new(tokens);
        let steps = scan_all(&mut s, b"\"a\nb\"|~|\"c\"\n");
        assert_eq!(steps[0], FrameStep::Record { start: 0, end: 11, next: 12 });
    }

    #[test]
    fn test_ambiguous_newline_resolved_by_whole_line() {
        // second column starts with a newline
        let tokens = MultiDelimTokens::new(b";", Terminator::Lf, Some(b'"'), Some(b'\\'), 2);
        let mut s = MultiDelimScanner::new(tokens);
        let data = b"\"a\";\"\nb\"\n";
        let steps = scan_all(&mut s, data);
        assert_eq!(steps[0], FrameStep::Record { start: 0, end: 8, next: 9 });
    }

    #[test]
    fn test_ambiguous_newline_invalid_row() {
        let tokens = MultiDelimTokens::new(b";", Terminator::Lf, Some(b'"'), Some(b'\\'), 3);
        let mut s = MultiDelimScanner::new(tokens);
        let steps = scan_all(&mut s, b"\"a\";\"\nb\"\n\"x\";\"y\";\"z\"\n");
        assert_eq!(
            steps[0],
            FrameStep::Malformed { reason: MalformedReason::IncompleteRow, start: 0, next: 6 }
        );
    }

    #[test]
    fn test_eof_without_terminator() {
        let tokens = MultiDelimTokens::new(b";;", Terminator::Lf, None, None, 2);
        let mut s = MultiDelimScanner::new(tokens);
        let steps = scan_all(&mut s, b"a;;b");
        assert_eq!(
            steps[0],
            FrameStep::Malformed { reason: MalformedReason::UnexpectedEof, start: 0, next: 4 }
        );

        let tokens = MultiDelimTokens::new(b";;", Terminator::Lf, Some(b'"'), None, 2);
        let mut s = MultiDelimScanner::new(tokens);
        let steps = scan_all(&mut s, b"\"a\";;\"b\"");
        assert_eq!(
            steps[0],
            FrameStep::Malformed {
                reason: MalformedReason::MissingQuotedToken("newline"),
                start: 0,
                next: 8
            }
        );
    }

    #[test]
    fn test_token_split_across_chunks() {
        let tokens = MultiDelimTokens::new(b";;", Terminator::CrLf, None, None, 2);
        let mut s = MultiDelimScanner::new(tokens);
        let mut buf = b"a;;b\r".to_vec();
        buf.push(0);
        let w = ScanWindow::over(&buf, 5, false);
        assert_eq!(s.find_record_end(&w, 0), FrameStep::NeedMore);

        let mut buf = b"a;;b\r\n".to_vec();
        buf.push(0);
        let w = ScanWindow::over(&buf, 6, false);
        assert_eq!(s.find_record_end(&w, 0), FrameStep::Record { start: 0, end: 4, next: 6 });
    }

    #[test]
    fn test_doubled_quotes_in_whole_line_check() {
        let tokens = MultiDelimTokens::new(b";", Terminator::Lf, Some(b'"'), Some(b'"'), 2);
        let s = MultiDelimScanner::new(tokens);
        let from = WholeLineCursor::default();
        assert_eq!(s.find_whole_line(b"\"\"\"\";\"\nx\"\n", b'"', from), WholeLine::Complete(9));
        assert!(matches!(s.find_whole_line(b"\"a\";\"b", b'"', from), WholeLine::Incomplete(_)));
    }

    #[test]
    fn test_whole_line_check_resumes_across_chunks() {
        let tokens = MultiDelimTokens::new(b";", Terminator::Lf, Some(b'"'), Some(b'\\'), 3);
        let mut s = MultiDelimScanner::new(tokens);
        let row = b"\"a\";\"\nb\";\"cc\"\n";

        let mut buf = row[..11].to_vec();
        buf.push(0);
        let w = ScanWindow::over(&buf, 11, false);
        assert_eq!(s.find_record_end(&w, 0), FrameStep::NeedMore);
        assert_eq!(s.whole_line, WholeLineCursor { column: 2, pos: 11, inside: true });
        assert_eq!(s.scan_from, 4);

        let mut buf = row.to_vec();
        buf.push(0);
        let w = ScanWindow::over(&buf, row.len(), false);
        assert_eq!(s.find_record_end(&w, 0), FrameStep::Record { start: 0, end: 13, next: 14 });
        assert_eq!(s.whole_line, WholeLineCursor::default());
    }
}
