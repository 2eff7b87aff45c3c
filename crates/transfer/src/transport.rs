//! Transport seam between the engine and the chunk endpoint.
//!
//! The engine never talks HTTP itself; the caller injects a
//! [`ChunkTransport`] (the `turbo-http` crate provides the `reqwest` one).

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use turbo_protocol::{ReconstructionResponse, SessionOpened};

/// Boxed future returned by transport calls.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Errors reported by a transport.
///
/// `Clone` so a failure can travel inside an [`UploadEvent`](crate::UploadEvent)
/// and still be returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Extra headers attached to chunk and finalize requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadHeaders {
    /// Payer addresses the upload cost is attributed to (`x-paid-by`).
    pub paid_by: Vec<String>,
}

impl UploadHeaders {
    /// Headers as `(name, value)` pairs, protocol version first.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(
            turbo_protocol::HEADER_CHUNKING_VERSION,
            turbo_protocol::CHUNKING_VERSION.to_string(),
        )];
        for payer in &self.paid_by {
            pairs.push((turbo_protocol::HEADER_PAID_BY, payer.clone()));
        }
        pairs
    }
}

/// Abstract connection to the chunk storage endpoint.
///
/// Implementations own retry policy; the engine calls each method once.
pub trait ChunkTransport: Send + Sync {
    /// Opens a session for `token` with the requested chunk size.
    fn open_session<'a>(
        &'a self,
        token: &'a str,
        chunk_byte_count: u64,
    ) -> TransportFuture<'a, SessionOpened>;

    /// Stores `data` at `offset` within the session.
    fn put_chunk<'a>(
        &'a self,
        token: &'a str,
        session_id: &'a str,
        offset: u64,
        data: Bytes,
        headers: &'a UploadHeaders,
    ) -> TransportFuture<'a, ()>;

    /// Asks the server to reassemble every stored chunk of the session.
    fn finalize<'a>(
        &'a self,
        token: &'a str,
        session_id: &'a str,
        headers: &'a UploadHeaders,
    ) -> TransportFuture<'a, ReconstructionResponse>;
}
