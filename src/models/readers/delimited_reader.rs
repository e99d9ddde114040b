//! DelimitedReader: synchronous pull loop over any `Read`.
//! - Reads chunks sized by [`BufferChunkSize`] and feeds the row assembler.
//! - Yields decoded rows, or whole `minarrow::Table` batches.
//! - Bad rows fail the read or are skipped, per [`RejectPolicy`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use minarrow::Table;
use tracing::debug;

use crate::enums::{BufferChunkSize, RowOutcome};
use crate::error::CodecError;
use crate::models::decoders::row::{Row, RowAssembler};
use crate::models::decoders::table::TableBuilder;
use crate::models::readers::reject::{RejectPolicy, RejectTracker, RejectedRow};
use crate::options::{ColumnSpec, DialectConfig};
use crate::traits::field_decoder::FieldDecoder;
use crate::traits::stream_buffer::StreamBuffer;

/// DelimitedReader provides a high-level interface for reading delimited
/// streams into rows or Minarrow Tables.
/// - Use `from_path`, `from_reader`, or `from_slice`.
/// - `next_row` for row-at-a-time decoding, `next_batch` for tables.
pub struct DelimitedReader<R: Read, B: StreamBuffer = Vec<u8>> {
    reader: R,
    rows: RowAssembler<B>,
    chunk: Vec<u8>,
    rejects: RejectTracker,
}

impl DelimitedReader<File> {
    /// Open the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, config: DialectConfig) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file, config).with_chunk_size(BufferChunkSize::FileIO))
    }
}

impl<'a> DelimitedReader<&'a [u8]> {
    pub fn from_slice(slice: &'a [u8], config: DialectConfig) -> Self {
        Self::from_reader(slice, config)
    }
}

impl<R: Read, B: StreamBuffer> DelimitedReader<R, B> {
    /// Wrap any reader. Chunks default to [`BufferChunkSize::InMemory`].
    pub fn from_reader(reader: R, config: DialectConfig) -> Self {
        Self {
            reader,
            rows: RowAssembler::new(config),
            chunk: vec![0u8; BufferChunkSize::InMemory.chunk_size()],
            rejects: RejectTracker::default(),
        }
    }

    pub fn with_chunk_size(mut self, size: BufferChunkSize) -> Self {
        self.chunk = vec![0u8; size.chunk_size()];
        self
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.rejects = RejectTracker::new(policy);
        self
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        self.rows.columns()
    }

    /// Rows skipped so far under a skip policy.
    pub fn rejected(&self) -> &[RejectedRow] {
        self.rejects.rejected()
    }

    pub fn take_rejected(&mut self) -> Vec<RejectedRow> {
        self.rejects.take_rejected()
    }

    /// Decode the next good row, or `None` at end of stream.
    pub fn next_row<F: FieldDecoder>(&mut self, decoder: &mut F) -> Result<Option<Row<F::Value>>, CodecError> {
        loop {
            match self.rows.next_row(decoder) {
                Ok(RowOutcome::Row(row)) => {
                    self.rejects.accept();
                    return Ok(Some(row));
                }
                Ok(RowOutcome::EndOfStream) => return Ok(None),
                Ok(RowOutcome::NeedMoreInput) => self.fill()?,
                Err(err) => self.rejects.reject(err)?,
            }
        }
    }

    /// Decode every remaining row.
    pub fn read_rows<F: FieldDecoder>(&mut self, decoder: &mut F) -> Result<Vec<Row<F::Value>>, CodecError> {
        let mut out = Vec::new();
        while let Some(row) = self.next_row(decoder)? {
            out.push(row);
        }
        Ok(out)
    }

    /// Read up to `batch_size` rows as a Table. `None` once the stream is done.
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Option<Table>, CodecError> {
        let mut builder = TableBuilder::new(self.rows.columns().into());
        while builder.len() < batch_size.max(1) {
            match self.next_row(&mut builder)? {
                Some(row) => builder.push_row(row).map_err(|e| CodecError::Encode(e.message))?,
                None => break,
            }
        }
        if builder.is_empty() {
            return Ok(None);
        }
        Ok(Some(builder.finish(String::new())))
    }

    /// Consume the entire input into a single Table.
    pub fn into_table(mut self) -> Result<Table, CodecError> {
        let mut builder = TableBuilder::new(self.rows.columns().into());
        while let Some(row) = self.next_row(&mut builder)? {
            builder.push_row(row).map_err(|e| CodecError::Encode(e.message))?;
        }
        Ok(builder.finish(String::new()))
    }

    fn fill(&mut self) -> Result<(), CodecError> {
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    debug!("source exhausted");
                    self.rows.at_end_of_input();
                    return Ok(());
                }
                Ok(n) => {
                    self.rows.feed(&self.chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
