//! Chunked upload engine.
//!
//! Splits a signed payload into fixed-size chunks, uploads them
//! concurrently under one server-side session and finalizes the session
//! so the server can reassemble the payload.
//!
//! # Pipeline
//!
//! 1. **Decide**: [`decide`] validates parameters and picks chunked vs. single request
//! 2. **Open**: request a session id for the token and chunk size
//! 3. **Stream**: [`ChunkSplitter`] slices the source, [`ConcurrencyLimiter`] bounds uploads
//! 4. **Finalize**: once every chunk settled successfully, ask the server to reassemble

mod chunked;
mod limiter;
mod policy;
mod progress;
mod transport;
mod types;
mod uploader;

pub use chunked::{
    BufferSource, ByteSource, ChunkSplitter, DEFAULT_READ_SIZE, NextBytes, ReaderSource,
    StreamSource,
};
pub use limiter::ConcurrencyLimiter;
pub use policy::{ChunkingConfig, ChunkingMode, decide, validate_chunking_params};
pub use progress::{EventHandler, EventKind, ProgressEmitter, UploadEvent};
pub use transport::{ChunkTransport, TransportError, TransportFuture, UploadHeaders};
pub use types::{Chunk, ProgressState, SessionState, UploadSession};
pub use uploader::{ChunkedUploader, UploadOptions};

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Smallest accepted chunk size: 5 MiB.
pub const MIN_CHUNK_BYTE_COUNT: u64 = 5 * MIB;

/// Largest accepted chunk size: 500 MiB.
pub const MAX_CHUNK_BYTE_COUNT: u64 = 500 * MIB;

/// Default chunk size: 5 MiB.
///
/// Fixed rather than derived from the payload size; callers with very large
/// payloads can raise it through [`ChunkingConfig::chunk_byte_count`].
pub const DEFAULT_CHUNK_BYTE_COUNT: u64 = MIN_CHUNK_BYTE_COUNT;

/// Default number of chunk uploads in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to open upload session: {0}")]
    SessionOpen(#[source] TransportError),

    #[error("chunk {part_number} (offset {offset}, {byte_count} bytes) failed: {source}")]
    ChunkUpload {
        part_number: u64,
        offset: u64,
        byte_count: u64,
        #[source]
        source: TransportError,
    },

    #[error("failed to finalize upload session {session_id}: {source}")]
    Finalize {
        session_id: String,
        #[source]
        source: TransportError,
    },

    #[error("source produced {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("source error: {0}")]
    Source(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}
