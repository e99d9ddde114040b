//! # Record decoder
//!
//! Turns an arbitrarily chunked byte stream into framed, split records.
//!
//! ## Overview
//! - `feed` appends a chunk; `at_end_of_input` marks the source exhausted.
//! - `next_record` frames and splits one record, or reports
//!   `NeedMoreInput`, `EndOfStream`, or a `Malformed` record.
//! - The result does not depend on where chunk boundaries fall.
//! - Returned records borrow the decoder's scratch arena, so they must be
//!   dropped before the next call.
//!
//! ## Projection
//! `next_record_prefix(n)` splits only the first `n` fields of a Text or
//! CSV record. `resume_split` then finishes the same record from where the
//! split stopped, so callers that only need a leading column can decide
//! before paying for the rest.
//!
//! ## Errors
//! A malformed record never poisons the stream: the cursor moves past it and
//! the next call continues with the following record.

use tracing::{debug, trace, warn};

use crate::enums::{Dialect, Encoding, FrameStep, ParseOutcome, Terminator};
use crate::error::{MalformedReason, MalformedRecord};
use crate::models::buffers::ring_buffer::{ByteRingBuffer, ScanWindow};
use crate::models::framers::line_framer::LineFramer;
use crate::models::framers::multi_delim::{MultiDelimScanner, MultiDelimTokens};
use crate::models::splitters::arena::{FieldArena, Record};
use crate::models::splitters::csv::CsvSplitter;
use crate::models::splitters::text::TextSplitter;
use crate::options::DialectConfig;
use crate::traits::record_dialect::{RecordDialect, SplitEnd};
use crate::traits::stream_buffer::StreamBuffer;
use crate::traits::transcoder::{BuiltinTranscoder, Transcoder};
use crate::utils::DisplayBytes;

#[derive(Debug, Clone)]
pub enum LineGrammar {
    Text(TextSplitter),
    Csv(CsvSplitter),
}

/// The closed set of dialects behind [`RecordDialect`].
#[derive(Debug, Clone)]
pub enum DialectEngine {
    Line { framer: LineFramer, grammar: LineGrammar },
    Multi(MultiDelimScanner),
}

impl DialectEngine {
    pub fn from_config(config: &DialectConfig) -> Self {
        let single = config.delimiter().and_then(|d| d.first().copied());
        match config.dialect() {
            Dialect::TextEscape => DialectEngine::Line {
                framer: LineFramer::text(config.escape(), config.end_of_stream())
                    .with_terminator(config.terminator())
                    .with_encoding(config.encoding())
                    .with_lenient_newlines(config.lenient_newlines()),
                grammar: LineGrammar::Text(TextSplitter::new(
                    single,
                    config.escape(),
                    config.null_marker().to_vec(),
                )),
            },
            Dialect::CsvQuote => {
                let quote = config.quote().unwrap_or(b'"');
                let escape = config.escape().unwrap_or(quote);
                DialectEngine::Line {
                    framer: LineFramer::csv(quote, escape, config.end_of_stream())
                        .with_terminator(config.terminator())
                        .with_encoding(config.encoding())
                        .with_lenient_newlines(config.lenient_newlines()),
                    grammar: LineGrammar::Csv(CsvSplitter::new(
                        single,
                        quote,
                        escape,
                        config.null_marker().to_vec(),
                    )),
                }
            }
            Dialect::MultiDelimFixed => DialectEngine::Multi(MultiDelimScanner::new(MultiDelimTokens::new(
                config.delimiter().unwrap_or_default(),
                config.terminator().unwrap_or(Terminator::Lf),
                config.quote(),
                config.escape(),
                config.columns().len(),
            ))),
        }
    }

    /// Encoding of the lines the splitters receive.
    pub fn set_split_encoding(&mut self, encoding: Encoding) {
        match self {
            DialectEngine::Line { grammar: LineGrammar::Text(s), .. } => s.set_encoding(encoding),
            DialectEngine::Line { grammar: LineGrammar::Csv(s), .. } => s.set_encoding(encoding),
            DialectEngine::Multi(_) => {}
        }
    }

    /// Terminator in force, once detected or configured.
    pub fn terminator(&self) -> Option<Terminator> {
        match self {
            DialectEngine::Line { framer, .. } => framer.terminator(),
            DialectEngine::Multi(scanner) => match scanner.tokens().eol.as_slice() {
                b"\r\n" => Some(Terminator::CrLf),
                b"\r" => Some(Terminator::Cr),
                _ => Some(Terminator::Lf),
            },
        }
    }
}

impl RecordDialect for DialectEngine {
    fn find_record_end(&mut self, window: &ScanWindow<'_>, start: usize) -> FrameStep {
        match self {
            DialectEngine::Line { framer, .. } => framer.find_record_end(window, start),
            DialectEngine::Multi(scanner) => scanner.find_record_end(window, start),
        }
    }

    fn split(
        &mut self,
        line: &[u8],
        cursor: &mut usize,
        stop_at_field: Option<usize>,
        arena: &mut FieldArena,
    ) -> Result<SplitEnd, MalformedReason> {
        match self {
            DialectEngine::Line { grammar: LineGrammar::Text(s), .. } => s.split(line, cursor, stop_at_field, arena),
            DialectEngine::Line { grammar: LineGrammar::Csv(s), .. } => s.split(line, cursor, stop_at_field, arena),
            DialectEngine::Multi(scanner) => scanner.split(line, cursor, arena),
        }
    }

    fn rebase(&mut self, shift: usize) {
        match self {
            DialectEngine::Line { framer, .. } => framer.rebase(shift),
            DialectEngine::Multi(scanner) => scanner.rebase(shift),
        }
    }
}

/// A record whose split stopped early, kept for `resume_split`.
#[derive(Debug, Clone, Copy)]
struct PendingSplit {
    cursor: usize,
    number: u64,
    offset: u64,
    start: usize,
    end: usize,
}

/// Incremental decoder from bytes to records.
pub struct RecordDecoder<B: StreamBuffer = Vec<u8>> {
    config: DialectConfig,
    buffer: ByteRingBuffer<B>,
    engine: DialectEngine,
    arena: FieldArena,
    transcoder: Box<dyn Transcoder>,
    // converted line of a partly split record
    line: Vec<u8>,
    pending: Option<PendingSplit>,
    at_eof: bool,
    finished: bool,
    header_pending: bool,
    records: u64,
}

impl<B: StreamBuffer> RecordDecoder<B> {
    pub fn new(config: DialectConfig) -> Self {
        Self::with_capacity(config, 0)
    }

    /// Pre-size the input buffer for records of around `capacity` bytes.
    pub fn with_capacity(config: DialectConfig, capacity: usize) -> Self {
        let mut engine = DialectEngine::from_config(&config);
        let transcoder = Box::new(BuiltinTranscoder::new(config.encoding()));
        engine.set_split_encoding(transcoder.internal_encoding());
        Self {
            header_pending: config.header(),
            arena: FieldArena::with_capacity(capacity, config.columns().len()),
            buffer: ByteRingBuffer::with_capacity(capacity),
            engine,
            transcoder,
            config,
            line: Vec::new(),
            pending: None,
            at_eof: false,
            finished: false,
            records: 0,
        }
    }

    /// Replace the encoding conversion applied to each framed record.
    pub fn with_transcoder(mut self, transcoder: Box<dyn Transcoder>) -> Self {
        self.engine.set_split_encoding(transcoder.internal_encoding());
        self.transcoder = transcoder;
        self
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    /// Append a chunk of input. Returns the number of bytes accepted.
    ///
    /// Consumed bytes are dropped first, which invalidates positions held by
    /// the scanners, so they are rebased in the same step.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        if self.at_eof {
            warn!(len = chunk.len(), "input fed after end of input, ignored");
            return 0;
        }
        // positions of a half-split record do not survive compaction
        self.pending = None;
        let shift = self.buffer.compact();
        if shift > 0 {
            self.engine.rebase(shift);
        }
        self.buffer.append(chunk)
    }

    /// No more input will arrive. A trailing partial record becomes malformed.
    pub fn at_end_of_input(&mut self) {
        self.at_eof = true;
    }

    /// True once `EndOfStream` has been reported.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Records framed so far, including the header and malformed ones.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.remaining()
    }

    pub fn detected_terminator(&self) -> Option<Terminator> {
        self.engine.terminator()
    }

    pub fn next_record(&mut self) -> ParseOutcome<'_> {
        self.next_record_split(None)
    }

    /// Like [`next_record`](Self::next_record), but split only the first
    /// `fields` fields of a Text or CSV record.
    ///
    /// Column-count checks and `fill_missing` run once the record is
    /// complete. When the line has more fields, the rest stays pending for
    /// [`resume_split`](Self::resume_split) until the next call to
    /// `next_record*` or `feed`. Multi-delimiter records are always split
    /// whole.
    pub fn next_record_prefix(&mut self, fields: usize) -> ParseOutcome<'_> {
        self.next_record_split(Some(fields))
    }

    /// True while a record returned by `next_record_prefix` has fields left.
    pub fn has_pending_split(&self) -> bool {
        self.pending.is_some()
    }

    /// Split the remaining fields of the record last returned by
    /// [`next_record_prefix`](Self::next_record_prefix). The returned record
    /// holds every field of the line.
    ///
    /// `None` when nothing is pending.
    pub fn resume_split(&mut self) -> Option<Result<Record<'_>, MalformedRecord>> {
        let mut pending = self.pending.take()?;
        let result = split_fields(
            &mut self.engine,
            &self.config,
            &self.line,
            &mut pending.cursor,
            None,
            &mut self.arena,
        );
        Some(match result {
            Ok(_) => {
                trace!(record = pending.number, fields = self.arena.len(), "record completed");
                Ok(Record::new(&self.arena, pending.number, pending.offset))
            }
            Err(reason) => {
                let mut malformed = self.locate(reason, pending.start, pending.end);
                malformed.record = pending.number;
                debug!(record = pending.number, offset = pending.offset, reason = %malformed.reason, "malformed record");
                Err(malformed)
            }
        })
    }

    fn next_record_split(&mut self, stop_at_field: Option<usize>) -> ParseOutcome<'_> {
        self.pending = None;
        if self.finished {
            return ParseOutcome::EndOfStream;
        }
        loop {
            let start = self.buffer.consumed();
            let step = {
                let window = self.buffer.window(self.at_eof);
                self.engine.find_record_end(&window, start)
            };
            match step {
                FrameStep::NeedMore => return ParseOutcome::NeedMoreInput,
                FrameStep::Record { start, end, next } => {
                    self.buffer.consumed_up_to(next);
                    self.records += 1;
                    if self.header_pending {
                        self.header_pending = false;
                        debug!(record = self.records, "skipped header line");
                        continue;
                    }
                    return self.split_record(start, end, stop_at_field);
                }
                FrameStep::EndOfStream { pending, next } => {
                    self.buffer.consumed_up_to(next);
                    self.finished = true;
                    debug!(records = self.records, "end of stream");
                    match pending {
                        Some(range) if !self.header_pending => {
                            self.records += 1;
                            return self.split_record(range.start, range.end, stop_at_field);
                        }
                        _ => return ParseOutcome::EndOfStream,
                    }
                }
                FrameStep::Malformed { reason, start, next } => {
                    self.records += 1;
                    self.header_pending = false;
                    let malformed = self.locate(reason, start, next);
                    self.buffer.consumed_up_to(next);
                    debug!(record = malformed.record, offset = malformed.offset, reason = %malformed.reason, "malformed record");
                    return ParseOutcome::Malformed(malformed);
                }
            }
        }
    }

    fn locate(&self, reason: MalformedReason, start: usize, end: usize) -> MalformedRecord {
        let data = self.buffer.as_slice();
        let end = end.min(data.len());
        MalformedRecord {
            reason,
            record: self.records,
            offset: self.buffer.absolute_offset(start),
            data: DisplayBytes::new(&data[start.min(end)..end]),
        }
    }

    fn split_record(&mut self, start: usize, end: usize, stop_at_field: Option<usize>) -> ParseOutcome<'_> {
        let number = self.records;
        let offset = self.buffer.absolute_offset(start);
        self.arena.clear();

        let mut cursor = 0;
        let raw = &self.buffer.as_slice()[start..end];
        let result = match self.transcoder.to_internal(raw) {
            Ok(line) if stop_at_field.is_some() => {
                self.line.clear();
                self.line.extend_from_slice(&line);
                split_fields(&mut self.engine, &self.config, &self.line, &mut cursor, stop_at_field, &mut self.arena)
            }
            Ok(line) => split_fields(&mut self.engine, &self.config, &line, &mut cursor, None, &mut self.arena),
            Err(reason) => Err(reason),
        };
        match result {
            Ok(complete) => {
                if !complete {
                    self.pending = Some(PendingSplit { cursor, number, offset, start, end });
                }
                trace!(record = number, fields = self.arena.len(), complete, "record");
                ParseOutcome::Row(Record::new(&self.arena, number, offset))
            }
            Err(reason) => {
                let malformed = self.locate(reason, start, end);
                debug!(record = number, offset, reason = %malformed.reason, "malformed record");
                ParseOutcome::Malformed(malformed)
            }
        }
    }
}

/// Split `line` from `cursor` and, once the line is exhausted, reconcile
/// the field count with the configured columns.
///
/// Returns `false` when the split stopped at `stop_at_field` with fields
/// left on the line.
fn split_fields(
    engine: &mut DialectEngine,
    config: &DialectConfig,
    line: &[u8],
    cursor: &mut usize,
    stop_at_field: Option<usize>,
    arena: &mut FieldArena,
) -> Result<bool, MalformedReason> {
    let columns = config.columns();

    if config.dialect() == Dialect::MultiDelimFixed {
        engine.split(line, cursor, None, arena)?;
        return Ok(true);
    }

    if columns.is_empty() {
        return if line.is_empty() { Ok(true) } else { Err(MalformedReason::ExtraData) };
    }

    let before = arena.len();
    let end = engine.split(line, cursor, stop_at_field, arena)?;
    if end.stopped_at_delimiter {
        apply_force_options(config, arena, before);
        return Ok(false);
    }

    let got = arena.len();
    if got > columns.len() {
        return Err(MalformedReason::ExtraData);
    }
    if got < columns.len() {
        if !config.fill_missing() {
            return Err(MalformedReason::MissingColumn(columns[got].name.clone()));
        }
        if line.is_empty() && columns.len() > 1 {
            return Err(MalformedReason::EmptyDataLine(columns[1].name.clone()));
        }
        for _ in got..columns.len() {
            arena.push_missing();
        }
    }

    apply_force_options(config, arena, before);
    Ok(true)
}

/// CSV per-column null overrides, for fields from index `from` on.
fn apply_force_options(config: &DialectConfig, arena: &mut FieldArena, from: usize) {
    if config.dialect() == Dialect::CsvQuote {
        let null_marker = config.null_marker();
        for (i, column) in config.columns().iter().enumerate().skip(from) {
            let Some(field) = arena.field(i) else { continue };
            if field.missing {
                continue;
            }
            if column.force_not_null && field.is_null {
                arena.replace(i, null_marker);
            } else if column.force_null && !field.is_null && field.bytes == null_marker {
                arena.set_null(i);
            }
        }
    }
}
