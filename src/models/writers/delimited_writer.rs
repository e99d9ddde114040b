//! # Delimited Writer
//!
//! Streams rows, or whole [`minarrow::Table`]s, to any [`std::io::Write`]
//! in the configured Text, CSV or multi-delimiter dialect.
//!
//! ## Quick start
//! ```no_run
//! use delimstream::models::writers::delimited_writer::DelimitedWriter;
//! use delimstream::options::{DialectConfig, DialectOptions};
//!
//! let config = DialectConfig::with_text_columns(&DialectOptions::csv(), 2)?;
//! let mut w = DelimitedWriter::new_vec(&config);
//! w.write_row(&[Some(b"1".as_slice()), None])?;
//! w.write_end_marker()?;
//! let bytes = w.into_inner();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use minarrow::Table;

use crate::models::encoders::delimited::{DelimitedEncoder, encode_table};
use crate::options::DialectConfig;
use crate::traits::frame_encoder::FrameEncoder;

pub struct DelimitedWriter<W: Write> {
    writer: W,
    encoder: DelimitedEncoder,
    buf: Vec<u8>,
    rows: u64,
}

impl DelimitedWriter<Vec<u8>> {
    /// Writer into an in-memory `Vec<u8>`.
    pub fn new_vec(config: &DialectConfig) -> Self {
        Self::new(Vec::new(), config)
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.writer
    }
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(writer: W, config: &DialectConfig) -> Self {
        Self { writer, encoder: DelimitedEncoder::new(config), buf: Vec::new(), rows: 0 }
    }

    /// Rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Write the column names as a header line.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.buf.clear();
        self.encoder.encode_header(&mut self.buf)?;
        self.writer.write_all(&self.buf)
    }

    /// Write one row. `None` is null.
    pub fn write_row(&mut self, row: &[Option<&[u8]>]) -> io::Result<()> {
        self.buf.clear();
        self.encoder.encode(&mut self.buf, &row)?;
        self.writer.write_all(&self.buf)?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_rows<'a, I>(&mut self, rows: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a [Option<&'a [u8]>]>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Write every row of `table`.
    pub fn write_table(&mut self, table: &Table) -> io::Result<()> {
        self.buf.clear();
        encode_table(&mut self.encoder, table, &mut self.buf)?;
        self.writer.write_all(&self.buf)?;
        self.rows += table.n_rows as u64;
        Ok(())
    }

    /// Append the end-of-stream token. A no-op for dialects without one.
    pub fn write_end_marker(&mut self) -> io::Result<()> {
        self.buf.clear();
        self.encoder.encode_end_marker(&mut self.buf);
        self.writer.write_all(&self.buf)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl DelimitedWriter<File> {
    /// Create (or truncate) the file at `path`.
    pub fn to_path<P: AsRef<Path>>(path: P, config: &DialectConfig) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file, config))
    }
}

#[cfg(test)]
mod tests {
    use minarrow::ArrowType;

    use super::*;
    use crate::options::{ColumnSpec, DialectOptions};
    use crate::test_helpers::{bool_col, int32_col, make_table, string32_col};

    #[test]
    fn test_rows_and_end_marker() {
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 2).unwrap();
        let mut w = DelimitedWriter::new_vec(&config);
        w.write_row(&[Some(b"a".as_slice()), None]).unwrap();
        w.write_row(&[Some(b"tab\there".as_slice()), Some(b"z".as_slice())]).unwrap();
        w.write_end_marker().unwrap();
        assert_eq!(w.rows_written(), 2);
        assert_eq!(w.into_inner(), b"a\t\\N\ntab\\there\tz\n\\.\n");
    }

    #[test]
    fn test_write_table_csv() {
        let table = make_table(
            "t",
            2,
            vec![int32_col("id", &[1, 2]), string32_col("name", &[Some("a,b"), None])],
        );
        let config = DialectOptions { header: true, ..DialectOptions::csv() }
            .validate(vec![ColumnSpec::new("id", ArrowType::Int32), ColumnSpec::text("name")])
            .unwrap();
        let mut w = DelimitedWriter::new_vec(&config);
        w.write_header().unwrap();
        w.write_table(&table).unwrap();
        assert_eq!(w.rows_written(), 2);
        assert_eq!(w.into_inner(), b"id,name\n1,\"a,b\"\n2,\n");
    }

    #[test]
    fn test_write_table_text_booleans() {
        let table = make_table("flags", 4, vec![int32_col("n", &[1, 2, 3, 4]), bool_col("ok")]);
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 2).unwrap();
        let mut w = DelimitedWriter::new_vec(&config);
        w.write_table(&table).unwrap();
        assert_eq!(w.into_inner(), b"1\ttrue\n2\tfalse\n3\ttrue\n4\ttrue\n");
    }

    #[test]
    fn test_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 1).unwrap();
        let mut w = DelimitedWriter::to_path(&path, &config).unwrap();
        w.write_row(&[Some(b"x".as_slice())]).unwrap();
        w.finish().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x\n");
    }
}
