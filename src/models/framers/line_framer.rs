//! # Line framer for the TEXT and CSV dialects
//!
//! Finds record terminators in a buffer that may end mid-record.
//!
//! ## Overview
//! - The terminator style (LF, CR, CRLF) is detected from the first one seen
//!   and frozen for the rest of the stream, unless fixed up front.
//! - CSV tracks quote state, so terminators inside quoted fields are data.
//! - TEXT steps over `escape + byte` pairs, so an escaped newline is data.
//! - The two-byte end-of-stream token (default `\.`) followed by a
//!   terminator ends the stream. CSV only honours it at the start of a line.
//! - Multi-byte characters are skipped whole in encodings whose trailing
//!   bytes can look like ASCII.
//!
//! ## Resumption
//! All scanning state is kept between calls. When a decision needs bytes
//! past the end of the buffer, the framer returns `NeedMore` without
//! committing anything for the undecided byte, and the next call picks up
//! at exactly that byte.

use tracing::{debug, trace};

use crate::enums::{Encoding, FrameStep, Terminator};
use crate::error::MalformedReason;
use crate::models::buffers::ring_buffer::ScanWindow;

/// Result of probing for the end-of-stream token at one position.
enum EndMarker {
    Incomplete,
    NotMarker,
    Marker,
    Corrupt { reason: MalformedReason, resume: usize },
}

#[derive(Debug, Clone, Copy)]
struct QuoteState {
    in_quote: bool,
    last_was_esc: bool,
}

#[derive(Debug, Clone)]
pub struct LineFramer {
    csv: bool,
    quote: u8,
    // CSV: None when it equals the quote. TEXT: None when off.
    escape: Option<u8>,
    end_marker: Option<[u8; 2]>,
    encoding: Encoding,
    lenient: bool,
    terminator: Option<Terminator>,

    pos: usize,
    quote_state: QuoteState,
    first_char_in_line: bool,
    pending_error: Option<MalformedReason>,
    finished: bool,
}

impl LineFramer {
    pub fn text(escape: Option<u8>, end_marker: Option<[u8; 2]>) -> Self {
        Self::build(false, 0, escape, end_marker)
    }

    pub fn csv(quote: u8, escape: u8, end_marker: Option<[u8; 2]>) -> Self {
        let escape = (escape != quote).then_some(escape);
        Self::build(true, quote, escape, end_marker)
    }

    fn build(csv: bool, quote: u8, escape: Option<u8>, end_marker: Option<[u8; 2]>) -> Self {
        Self {
            csv,
            quote,
            escape,
            end_marker,
            encoding: Encoding::Utf8,
            lenient: true,
            terminator: None,
            pos: 0,
            quote_state: QuoteState { in_quote: false, last_was_esc: false },
            first_char_in_line: true,
            pending_error: None,
            finished: false,
        }
    }

    pub fn with_terminator(mut self, terminator: Option<Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_lenient_newlines(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Terminator in force, once detected or configured.
    pub fn terminator(&self) -> Option<Terminator> {
        self.terminator
    }

    pub fn rebase(&mut self, shift: usize) {
        self.pos = self.pos.saturating_sub(shift);
    }

    fn reset_line(&mut self, next: usize) {
        self.pos = next;
        self.quote_state = QuoteState { in_quote: false, last_was_esc: false };
        self.first_char_in_line = true;
        self.pending_error = None;
    }

    fn freeze(&mut self, terminator: Terminator) {
        debug!(terminator = %terminator, "record terminator detected");
        self.terminator = Some(terminator);
    }

    fn emit(&mut self, start: usize, end: usize, next: usize) -> FrameStep {
        let step = match self.pending_error.take() {
            Some(reason) => FrameStep::Malformed { reason, start, next },
            None => {
                trace!(start, end, "framed record");
                FrameStep::Record { start, end, next }
            }
        };
        self.reset_line(next);
        step
    }

    fn flag(&mut self, reason: MalformedReason) {
        if self.pending_error.is_none() {
            self.pending_error = Some(reason);
        }
    }

    fn stray_cr(&self) -> MalformedReason {
        if self.csv {
            MalformedReason::UnquotedCarriageReturn
        } else {
            MalformedReason::LiteralCarriageReturn
        }
    }

    fn stray_lf(&self) -> MalformedReason {
        if self.csv { MalformedReason::UnquotedNewline } else { MalformedReason::LiteralNewline }
    }

    /// Look for the end-of-stream token whose first byte sits at `i`.
    fn check_end_marker(&self, w: &ScanWindow<'_>, i: usize, second: u8) -> EndMarker {
        if !w.has(i + 1, 1) {
            return EndMarker::Incomplete;
        }
        if w.byte(i + 1) != second {
            return EndMarker::NotMarker;
        }
        // sentinel reads at end of input can step past the last byte
        let corrupt = |reason, resume: usize| EndMarker::Corrupt { reason, resume: resume.min(w.len()) };
        let mut p = i + 2;

        if self.terminator == Some(Terminator::CrLf) {
            if !w.has(p, 1) {
                return EndMarker::Incomplete;
            }
            let c = w.byte(p);
            p += 1;
            if c == b'\n' {
                if self.csv {
                    return EndMarker::NotMarker;
                }
                return corrupt(MalformedReason::EndMarkerNewlineMismatch, p);
            }
            if c != b'\r' {
                if self.csv {
                    return EndMarker::NotMarker;
                }
                return corrupt(MalformedReason::EndMarkerCorrupt, p);
            }
        }

        if !w.has(p, 1) {
            return EndMarker::Incomplete;
        }
        let c = w.byte(p);
        p += 1;
        if c != b'\r' && c != b'\n' {
            if self.csv {
                return EndMarker::NotMarker;
            }
            return corrupt(MalformedReason::EndMarkerCorrupt, p);
        }
        let matches_style = match self.terminator {
            None => true,
            Some(Terminator::Lf) | Some(Terminator::CrLf) => c == b'\n',
            Some(Terminator::Cr) => c == b'\r',
        };
        if !matches_style {
            return corrupt(MalformedReason::EndMarkerNewlineMismatch, p);
        }
        EndMarker::Marker
    }

    /// Out of bytes: wait for more, or settle the final partial record.
    fn exhausted(&mut self, w: &ScanWindow<'_>, start: usize) -> FrameStep {
        if !w.at_eof() {
            return FrameStep::NeedMore;
        }
        let len = w.len();
        if len <= start {
            self.finished = true;
            return FrameStep::EndOfStream { pending: None, next: len };
        }
        let reason = if self.csv && self.quote_state.in_quote {
            MalformedReason::UnterminatedQuote
        } else {
            MalformedReason::UnexpectedEof
        };
        self.reset_line(len);
        FrameStep::Malformed { reason, start, next: len }
    }

    pub fn find_record_end(&mut self, w: &ScanWindow<'_>, start: usize) -> FrameStep {
        if self.finished {
            return FrameStep::EndOfStream { pending: None, next: w.len() };
        }
        if self.pos < start {
            self.reset_line(start);
        }

        loop {
            let i = self.pos;
            if i >= w.len() {
                return self.exhausted(w, start);
            }
            let c = w.byte(i);
            let saved = self.quote_state;

            if self.csv {
                // both may need a peek before the quote state moves
                let eos_lead = self.end_marker.map(|m| m[0]) == Some(c);
                if (c == b'\r' || eos_lead) && !w.has(i + 1, 1) {
                    return FrameStep::NeedMore;
                }
                let qs = &mut self.quote_state;
                if qs.in_quote && Some(c) == self.escape {
                    qs.last_was_esc = !qs.last_was_esc;
                }
                if c == self.quote && !qs.last_was_esc {
                    qs.in_quote = !qs.in_quote;
                }
                if Some(c) != self.escape {
                    qs.last_was_esc = false;
                }
            }
            let quoted = self.csv && self.quote_state.in_quote;

            if c == b'\r' && !quoted {
                if matches!(self.terminator, None | Some(Terminator::CrLf)) {
                    if !w.has(i + 1, 1) {
                        self.quote_state = saved;
                        return FrameStep::NeedMore;
                    }
                    if w.byte(i + 1) == b'\n' {
                        if self.terminator.is_none() {
                            self.freeze(Terminator::CrLf);
                        }
                        return self.emit(start, i, i + 2);
                    }
                    if self.terminator.is_none() {
                        self.freeze(Terminator::Cr);
                    } else if !self.lenient {
                        self.flag(self.stray_cr());
                    }
                } else if self.terminator == Some(Terminator::Lf) && !self.lenient {
                    self.flag(self.stray_cr());
                }
                if self.terminator == Some(Terminator::Cr) {
                    return self.emit(start, i, i + 1);
                }
            }

            if c == b'\n' && !quoted {
                if self.terminator.is_none() {
                    self.freeze(Terminator::Lf);
                }
                if self.terminator == Some(Terminator::Lf) {
                    return self.emit(start, i, i + 1);
                }
                if !self.lenient {
                    self.flag(self.stray_lf());
                }
            }

            if let Some([lead, second]) = self.end_marker {
                if c == lead && (!self.csv || (self.first_char_in_line && !quoted)) {
                    match self.check_end_marker(w, i, second) {
                        EndMarker::Incomplete => {
                            self.quote_state = saved;
                            return FrameStep::NeedMore;
                        }
                        EndMarker::Marker => {
                            debug!(offset = i, "end-of-stream marker");
                            self.finished = true;
                            let pending = (i > start).then_some(start..i);
                            return FrameStep::EndOfStream { pending, next: w.len() };
                        }
                        EndMarker::Corrupt { reason, resume } => {
                            self.reset_line(resume);
                            return FrameStep::Malformed { reason, start, next: resume };
                        }
                        EndMarker::NotMarker => {}
                    }
                }
            }

            if !self.csv && Some(c) == self.escape {
                // the escaped byte is data, whatever it is
                if !w.has(i + 1, 1) {
                    return FrameStep::NeedMore;
                }
                self.pos = (i + 2).min(w.len());
                self.first_char_in_line = false;
                continue;
            }

            if self.encoding.embeds_ascii() && c >= 0x80 {
                let n = self.encoding.char_len(c);
                if !w.has(i, n) {
                    self.quote_state = saved;
                    return FrameStep::NeedMore;
                }
                self.pos = (i + n).min(w.len());
                self.first_char_in_line = false;
                continue;
            }

            self.pos = i + 1;
            self.first_char_in_line = false;
        }
    }
}
