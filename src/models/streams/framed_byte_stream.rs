//! # Generic async framed byte stream
//!
//! Adapts any chunked byte source into a stream of frames using a
//! caller-supplied [`FrameDecoder`], e.g. the binary row decoder.
//!
//! - Works with any `GenByteStream<B>` (file, socket, in-memory chunks).
//! - Buffers partial input and yields complete frames as soon as available.
//! - Once the source is exhausted, hands the remainder to
//!   [`FrameDecoder::decode_eof`] so trailing frames and truncation are
//!   resolved by the decoder itself.

use futures_core::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tracing::trace;

use crate::enums::DecodeResult;
use crate::traits::byte_stream::GenByteStream;
use crate::traits::frame_decoder::FrameDecoder;
use crate::traits::stream_buffer::StreamBuffer;

/// Asynchronous framed byte stream adapter.
///
/// ## Behaviour
/// - Decoder output must follow [`DecodeResult`] semantics.
/// - Buffer is only drained after a successful frame decode.
/// - After an error the stream is fused and yields `None`.
///
/// ## Examples
/// ```ignore
/// let framed = FramedByteStream::new(chunks, BinaryFrameDecoder::new(3), 4096);
/// ```
pub struct FramedByteStream<S, D, B>
where
    S: GenByteStream<B>,
    D: FrameDecoder,
    B: StreamBuffer,
{
    pub(crate) inner: S,
    decoder: D,
    /// Rolling buffer holding unread/partial bytes.
    buf: B,
    eof: bool,
    done: bool,
}

impl<S, D, B> FramedByteStream<S, D, B>
where
    S: GenByteStream<B>,
    D: FrameDecoder,
    B: StreamBuffer,
{
    /// Create a new framed byte stream with the specified decoder and buffer capacity.
    pub fn new(stream: S, decoder: D, initial_capacity: usize) -> Self {
        Self {
            inner: stream,
            decoder,
            buf: B::with_capacity(initial_capacity),
            eof: false,
            done: false,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn into_decoder(self) -> D {
        self.decoder
    }
}

impl<S, D, B> Stream for FramedByteStream<S, D, B>
where
    S: GenByteStream<B>,
    D: FrameDecoder + Unpin,
    B: StreamBuffer + Unpin,
{
    type Item = Result<D::Frame, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        if me.done {
            return Poll::Ready(None);
        }

        loop {
            let decoded = if me.eof {
                me.decoder.decode_eof(me.buf.as_ref())
            } else {
                me.decoder.decode(me.buf.as_ref())
            };
            match decoded {
                Ok(DecodeResult::Frame { frame, consumed }) => {
                    me.buf.drain(0..consumed);
                    return Poll::Ready(Some(Ok(frame)));
                }
                Ok(DecodeResult::NeedMore) if me.eof => {
                    me.done = true;
                    return Poll::Ready(None);
                }
                Ok(DecodeResult::NeedMore) => {}
                Err(e) => {
                    me.buf = B::default();
                    me.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }

            match Pin::new(&mut me.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    trace!(bytes = chunk.as_ref().len(), "chunk received");
                    me.buf.extend_from_slice(chunk.as_ref());
                }
                Poll::Ready(Some(Err(e))) => {
                    me.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => me.eof = true,
            }
        }
    }
}
