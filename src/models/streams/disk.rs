//! # Asynchronous disk byte stream
//!
//! Wraps a file in a [`Stream`] that yields byte chunks of at most the
//! configured [`BufferChunkSize`], for feeding a `RecordStream` or a
//! `FramedByteStream` straight from disk.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use minarrow::{Vec64, vec64};
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader, ReadBuf};

use crate::enums::BufferChunkSize;

/// A `Stream` that reads a file in fixed-size byte chunks.
///
/// - Tokio `BufReader` based, with back-pressure through `poll_next`.
/// - One copy into a `Vec64<u8>` per chunk.
pub struct DiskByteStream {
    reader: BufReader<File>,
    /// Set once the file is exhausted or a read failed.
    eof: bool,
    /// Staging buffer, handed out and replaced on every chunk.
    buf: Vec64<u8>,
    chunk_size: usize,
}

impl DiskByteStream {
    /// Open `path` for chunked reading.
    pub async fn open(path: impl AsRef<Path>, size: BufferChunkSize) -> io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::from_file(file, size))
    }

    pub fn from_file(file: File, size: BufferChunkSize) -> Self {
        let chunk_size = size.chunk_size();
        Self {
            reader: BufReader::with_capacity(chunk_size, file),
            eof: false,
            buf: vec64![0u8; chunk_size],
            chunk_size,
        }
    }
}

impl Stream for DiskByteStream {
    type Item = Result<Vec64<u8>, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        if me.eof {
            return Poll::Ready(None);
        }

        let mut read_buf = ReadBuf::new(&mut me.buf[..me.chunk_size]);
        let polled = Pin::new(&mut me.reader).poll_read(cx, &mut read_buf);
        let n = read_buf.filled().len();
        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) if n == 0 => {
                me.eof = true;
                Poll::Ready(None)
            }
            Poll::Ready(Ok(())) => {
                let mut out = std::mem::replace(&mut me.buf, vec64![0u8; me.chunk_size]);
                out.truncate(n);
                Poll::Ready(Some(Ok(out)))
            }
            Poll::Ready(Err(e)) => {
                me.eof = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}
