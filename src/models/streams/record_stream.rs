//! # Async record stream
//!
//! Polls any [`GenByteStream`] for chunks, feeds them to a [`RowAssembler`]
//! and yields owned rows decoded by the caller's [`FieldDecoder`].
//!
//! - When the source ends, the assembler is told so and the final
//!   unterminated record is resolved.
//! - Bad rows go through a [`RejectTracker`]: with the default
//!   [`RejectPolicy::AllOrNothing`] the first one ends the stream with an
//!   error, under a skip policy they are recorded and skipped.
//! - Any error fuses the stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tracing::debug;

use crate::enums::RowOutcome;
use crate::error::CodecError;
use crate::models::decoders::row::{Row, RowAssembler};
use crate::models::readers::reject::{RejectPolicy, RejectTracker, RejectedRow};
use crate::options::DialectConfig;
use crate::traits::byte_stream::GenByteStream;
use crate::traits::field_decoder::FieldDecoder;
use crate::traits::stream_buffer::StreamBuffer;

pub struct RecordStream<S, F, B = Vec<u8>>
where
    S: GenByteStream<B>,
    F: FieldDecoder,
    B: StreamBuffer,
{
    inner: S,
    rows: RowAssembler<B>,
    decoder: F,
    rejects: RejectTracker,
    source_done: bool,
    done: bool,
}

impl<S, F, B> RecordStream<S, F, B>
where
    S: GenByteStream<B>,
    F: FieldDecoder,
    B: StreamBuffer,
{
    pub fn new(inner: S, config: DialectConfig, decoder: F) -> Self {
        Self::from_assembler(inner, RowAssembler::new(config), decoder)
    }

    pub fn from_assembler(inner: S, rows: RowAssembler<B>, decoder: F) -> Self {
        Self {
            inner,
            rows,
            decoder,
            rejects: RejectTracker::default(),
            source_done: false,
            done: false,
        }
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.rejects = RejectTracker::new(policy);
        self
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        self.rejects.rejected()
    }

    pub fn decoder(&self) -> &F {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut F {
        &mut self.decoder
    }

    /// Hand back the field decoder, e.g. a `TableBuilder` to finish.
    pub fn into_decoder(self) -> F {
        self.decoder
    }
}

#[cfg(feature = "disk")]
impl<F: FieldDecoder> RecordStream<crate::models::streams::disk::DiskByteStream, F, minarrow::Vec64<u8>> {
    /// Stream rows out of the file at `path`.
    pub async fn from_path(
        path: impl AsRef<std::path::Path>,
        config: DialectConfig,
        decoder: F,
        size: crate::enums::BufferChunkSize,
    ) -> std::io::Result<Self> {
        let source = crate::models::streams::disk::DiskByteStream::open(path, size).await?;
        Ok(Self::new(source, config, decoder))
    }
}

impl<S, F, B> Stream for RecordStream<S, F, B>
where
    S: GenByteStream<B>,
    F: FieldDecoder + Unpin,
    B: StreamBuffer + Unpin,
{
    type Item = Result<Row<F::Value>, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        if me.done {
            return Poll::Ready(None);
        }

        loop {
            match me.rows.next_row(&mut me.decoder) {
                Ok(RowOutcome::Row(row)) => {
                    me.rejects.accept();
                    return Poll::Ready(Some(Ok(row)));
                }
                Ok(RowOutcome::EndOfStream) => {
                    me.done = true;
                    return Poll::Ready(None);
                }
                Ok(RowOutcome::NeedMoreInput) => {}
                Err(err) => {
                    if let Err(e) = me.rejects.reject(err) {
                        me.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    continue;
                }
            }

            // NeedMoreInput after end of input cannot happen; guard anyway so
            // a misbehaving source can't spin us.
            if me.source_done {
                me.done = true;
                return Poll::Ready(None);
            }

            match Pin::new(&mut me.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    me.rows.feed(chunk.as_ref());
                }
                Poll::Ready(Some(Err(e))) => {
                    me.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    debug!(records = me.rows.records().records_read(), "source exhausted");
                    me.source_done = true;
                    me.rows.at_end_of_input();
                }
            }
        }
    }
}
