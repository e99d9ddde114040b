//! # delimstream
//!
//! Incremental codec for TEXT, CSV and multi-byte-delimited record streams.
//!
//! Bytes arrive in chunks of any size through `feed`, and records come out
//! of [`models::decoders::record::RecordDecoder::next_record`] with exact
//! row and column boundaries, whatever the chunking. `NeedMoreInput` asks for
//! the next chunk; `Malformed` reports a grammar violation with its record
//! number and byte offset.
//!
//! Layers on top:
//! - [`models::decoders::row::RowAssembler`] maps fields to columns through
//!   an injected [`traits::field_decoder::FieldDecoder`].
//! - [`models::readers::delimited_reader::DelimitedReader`] and
//!   [`models::streams::record_stream::RecordStream`] drive the decoder from
//!   a `Read` or an async chunk source.
//! - [`models::writers::delimited_writer::DelimitedWriter`] writes the same
//!   dialects back out.
//! - [`models::decoders::binary`] and [`models::encoders::binary`] handle the
//!   length-prefixed binary row format.

pub mod traits {
    pub mod byte_stream;
    pub mod field_decoder;
    pub mod frame_decoder;
    pub mod frame_encoder;
    pub mod record_dialect;
    pub mod stream_buffer;
    pub mod transcoder;
}

pub mod models {
    pub mod buffers {
        pub mod ring_buffer;
    }
    pub mod framers {
        pub mod line_framer;
        pub mod multi_delim;
    }
    pub mod splitters {
        pub mod arena;
        pub mod csv;
        pub mod multi_delim;
        pub mod text;
    }
    pub mod decoders {
        pub mod binary;
        pub mod record;
        pub mod row;
        pub mod table;
    }
    pub mod encoders {
        pub mod binary;
        pub mod delimited;
    }
    pub mod readers {
        pub mod delimited_reader;
        pub mod reject;
    }
    pub mod writers {
        pub mod delimited_writer;
    }
    pub mod streams {
        #[cfg(feature = "disk")]
        pub mod disk;
        pub mod framed_byte_stream;
        pub mod record_stream;
    }
}

pub mod constants;
pub mod enums;
pub mod error;
pub mod options;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::enums::{Dialect, Encoding, ParseOutcome, RowOutcome, Terminator};
pub use crate::error::{CodecError, ConfigError, MalformedReason, MalformedRecord, RowError};
pub use crate::models::decoders::record::RecordDecoder;
pub use crate::models::decoders::row::{Row, RowAssembler};
pub use crate::options::{ColumnSpec, DialectConfig, DialectOptions};
