use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read size used by [`ReaderSource`] when none is given: 64 KiB.
pub const DEFAULT_READ_SIZE: usize = 64 * 1024;

/// Future returned by [`ByteSource::next_bytes`].
pub type NextBytes<'a> = Pin<Box<dyn Future<Output = io::Result<Option<Bytes>>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// ByteSource
// ---------------------------------------------------------------------------

/// A sequential source of payload bytes.
///
/// Yields arbitrarily sized pieces until it returns `Ok(None)`. Pieces may be
/// empty; that does not signal the end. Implementations must be cancel-safe:
/// if the returned future is dropped before completing, no bytes are lost.
pub trait ByteSource: Send {
    /// Returns the next piece of the payload, or `None` once exhausted.
    fn next_bytes(&mut self) -> NextBytes<'_>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_bytes(&mut self) -> NextBytes<'_> {
        (**self).next_bytes()
    }
}

/// Pull-based adapter over any [`AsyncRead`] (files, sockets, pipes).
pub struct ReaderSource<R> {
    reader: R,
    read_size: usize,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wraps `reader`, reading up to [`DEFAULT_READ_SIZE`] bytes per call.
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, DEFAULT_READ_SIZE)
    }

    /// Wraps `reader` with a custom per-read size.
    ///
    /// If `read_size` is 0, [`DEFAULT_READ_SIZE`] is used.
    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        let read_size = if read_size == 0 {
            DEFAULT_READ_SIZE
        } else {
            read_size
        };
        Self { reader, read_size }
    }
}

impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn next_bytes(&mut self) -> NextBytes<'_> {
        Box::pin(async move {
            let mut buf = BytesMut::with_capacity(self.read_size);
            // `read_buf` is cancel-safe: nothing is consumed if dropped.
            let n = self.reader.read_buf(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(buf.freeze()))
        })
    }
}

/// Push-based adapter over a [`Stream`] of byte pieces.
pub struct StreamSource<S> {
    stream: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S> ByteSource for StreamSource<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
{
    fn next_bytes(&mut self) -> NextBytes<'_> {
        Box::pin(async move { self.stream.next().await.transpose() })
    }
}

/// In-memory payload yielded as a single piece.
pub struct BufferSource {
    data: Option<Bytes>,
}

impl BufferSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        Self {
            data: (!data.is_empty()).then_some(data),
        }
    }
}

impl ByteSource for BufferSource {
    fn next_bytes(&mut self) -> NextBytes<'_> {
        let next = self.data.take();
        Box::pin(async move { Ok(next) })
    }
}

// ---------------------------------------------------------------------------
// ChunkSplitter
// ---------------------------------------------------------------------------

/// Turns a [`ByteSource`] into fixed-size chunks.
///
/// Every chunk is exactly `chunk_size` bytes except the last, which holds
/// the remainder. Long pieces are sliced without copying; only short pieces
/// are copied, into a join buffer that never exceeds one chunk. The
/// sequence is finite and cannot be restarted.
pub struct ChunkSplitter<S> {
    source: S,
    chunk_size: usize,
    /// Unconsumed tail of the last source piece, shared with the source.
    remainder: Bytes,
    /// Short pieces being joined into the next chunk.
    buffer: BytesMut,
    exhausted: bool,
}

impl<S: ByteSource> ChunkSplitter<S> {
    /// Creates a splitter producing `chunk_size`-byte chunks.
    ///
    /// A `chunk_size` of 0 is bumped to 1.
    pub fn new(source: S, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            source,
            chunk_size,
            remainder: Bytes::new(),
            buffer: BytesMut::new(),
            exhausted: false,
        }
    }

    /// Returns the next chunk, or `None` once the source is drained.
    ///
    /// Cancel-safe: partially accumulated bytes stay buffered if the
    /// future is dropped, and the next call picks up where it left off.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if self.buffer.is_empty() && self.remainder.len() >= self.chunk_size {
                return Ok(Some(self.remainder.split_to(self.chunk_size)));
            }
            if !self.remainder.is_empty() {
                let take = (self.chunk_size - self.buffer.len()).min(self.remainder.len());
                if self.buffer.capacity() == 0 {
                    self.buffer.reserve(self.chunk_size);
                }
                self.buffer.extend_from_slice(&self.remainder.split_to(take));
            }
            if self.buffer.len() == self.chunk_size {
                return Ok(Some(self.buffer.split().freeze()));
            }
            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buffer.split().freeze()));
            }
            match self.source.next_bytes().await? {
                Some(piece) => self.remainder = piece,
                None => self.exhausted = true,
            }
        }
    }

    /// Target chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes copied into the join buffer and not yet handed out.
    ///
    /// At most one chunk. The sliced remainder of a large piece is not
    /// counted; it shares the source's allocation.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    const MIB: usize = 1024 * 1024;

    async fn collect<S: ByteSource>(mut splitter: ChunkSplitter<S>) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        while let Some(chunk) = splitter.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn twelve_mib_in_five_mib_chunks() {
        let data = pattern(12 * MIB);
        let splitter = ChunkSplitter::new(ReaderSource::new(&data[..]), 5 * MIB);
        let sizes: Vec<usize> = collect(splitter).await.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![5 * MIB, 5 * MIB, 2 * MIB]);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_empty_tail() {
        let splitter = ChunkSplitter::new(BufferSource::new(vec![7u8; 12]), 4);
        let chunks = collect(splitter).await;
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let splitter = ChunkSplitter::new(BufferSource::new(Vec::new()), 4);
        assert!(collect(splitter).await.is_empty());

        let empty: &[u8] = &[];
        let splitter = ChunkSplitter::new(ReaderSource::new(empty), 4);
        assert!(collect(splitter).await.is_empty());
    }

    #[tokio::test]
    async fn small_stream_pieces_are_coalesced() {
        let pieces: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"AAB")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"BC")),
            Ok(Bytes::from_static(b"CDDE")),
            Ok(Bytes::from_static(b"E")),
        ];
        let splitter = ChunkSplitter::new(StreamSource::new(stream::iter(pieces)), 4);
        let chunks = collect(splitter).await;
        assert_eq!(chunks, vec![
            Bytes::from_static(b"AABB"),
            Bytes::from_static(b"CCDD"),
            Bytes::from_static(b"EE"),
        ]);
    }

    #[tokio::test]
    async fn oversized_piece_is_sliced() {
        let pieces: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"0123456789"))];
        let splitter = ChunkSplitter::new(StreamSource::new(stream::iter(pieces)), 3);
        let chunks = collect(splitter).await;
        assert_eq!(chunks, vec![
            Bytes::from_static(b"012"),
            Bytes::from_static(b"345"),
            Bytes::from_static(b"678"),
            Bytes::from_static(b"9"),
        ]);
    }

    #[tokio::test]
    async fn stream_error_is_propagated() {
        let pieces: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        ];
        let mut splitter = ChunkSplitter::new(StreamSource::new(stream::iter(pieces)), 4);
        let err = splitter.next_chunk().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn random_pieces_partition_the_payload() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let total = rng.gen_range(0..5000);
            let chunk_size = rng.gen_range(1..700);
            let data = pattern(total);

            let mut pieces = Vec::new();
            let mut pos = 0;
            while pos < total {
                let len = rng.gen_range(0..1500).min(total - pos);
                pieces.push(Ok(Bytes::copy_from_slice(&data[pos..pos + len])));
                pos += len;
            }

            let splitter =
                ChunkSplitter::new(StreamSource::new(stream::iter(pieces)), chunk_size);
            let chunks = collect(splitter).await;

            let mut offset = 0;
            for (i, chunk) in chunks.iter().enumerate() {
                assert!(!chunk.is_empty());
                if i + 1 < chunks.len() {
                    assert_eq!(chunk.len(), chunk_size);
                } else {
                    assert!(chunk.len() <= chunk_size);
                }
                assert_eq!(&chunk[..], &data[offset..offset + chunk.len()]);
                offset += chunk.len();
            }
            assert_eq!(offset, total);
        }
    }

    #[tokio::test]
    async fn dropped_read_keeps_buffered_bytes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut splitter = ChunkSplitter::new(ReaderSource::with_read_size(rx, 2), 6);

        tx.write_all(b"abcd").await.unwrap();
        let pending =
            tokio::time::timeout(Duration::from_millis(50), splitter.next_chunk()).await;
        assert!(pending.is_err(), "chunk should not be complete yet");
        assert_eq!(splitter.buffered(), 4);

        tx.write_all(b"efgh").await.unwrap();
        drop(tx);

        let first = splitter.next_chunk().await.unwrap().unwrap();
        assert_eq!(&first[..], b"abcdef");
        let second = splitter.next_chunk().await.unwrap().unwrap();
        assert_eq!(&second[..], b"gh");
        assert!(splitter.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn large_piece_is_sliced_without_copying() {
        let chunk = 5 * MIB;
        let data = Bytes::from(pattern(64 * MIB));
        let base = data.as_ptr();
        let mut splitter = ChunkSplitter::new(BufferSource::new(data), chunk);

        let first = splitter.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.len(), chunk);
        assert_eq!(first.as_ptr(), base);
        assert!(splitter.buffered() <= 2 * chunk);

        let second = splitter.next_chunk().await.unwrap().unwrap();
        assert_eq!(second.as_ptr(), base.wrapping_add(chunk));
        assert!(splitter.buffered() <= 2 * chunk);
    }

    #[tokio::test]
    async fn short_head_then_long_piece() {
        let pieces: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cdefghijk")),
        ];
        let mut splitter = ChunkSplitter::new(StreamSource::new(stream::iter(pieces)), 4);

        assert_eq!(&splitter.next_chunk().await.unwrap().unwrap()[..], b"abcd");
        assert_eq!(splitter.buffered(), 0);
        assert_eq!(&splitter.next_chunk().await.unwrap().unwrap()[..], b"efgh");
        assert_eq!(&splitter.next_chunk().await.unwrap().unwrap()[..], b"ijk");
        assert!(splitter.next_chunk().await.unwrap().is_none());
    }

    #[test]
    fn zero_read_size_uses_default() {
        let empty: &[u8] = &[];
        let source = ReaderSource::with_read_size(empty, 0);
        assert_eq!(source.read_size, crate::DEFAULT_READ_SIZE);
    }

    #[test]
    fn zero_chunk_size_is_bumped() {
        let splitter = ChunkSplitter::new(BufferSource::new(vec![1u8]), 0);
        assert_eq!(splitter.chunk_size(), 1);
    }
}
