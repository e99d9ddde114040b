use futures_core::Stream;
use std::io;

/// Chunked byte source for the async record and frame streams.
///
/// Anything yielding `Result<B, io::Error>` chunks that is `Send + Unpin`
/// qualifies, e.g. a file reader, a socket adapter, or
/// `futures_util::stream::iter` over in-memory chunks in tests.
///
/// Because it is only a set of bounds, sources plug in without dynamic dispatch.
pub trait GenByteStream<B>: Stream<Item = Result<B, io::Error>> + Send + Unpin {}
impl<T, B> GenByteStream<B> for T where T: Stream<Item = Result<B, io::Error>> + Send + Unpin {}
