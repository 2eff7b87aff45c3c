//! Chunked upload orchestration.
//!
//! Opens a session, streams chunks through the limiter, waits for every
//! chunk to settle and finalizes. All counters live on the orchestrating
//! task; chunk futures only report their outcome back.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use turbo_protocol::ReconstructionResponse;

use crate::chunked::{ByteSource, ChunkSplitter};
use crate::limiter::ConcurrencyLimiter;
use crate::policy::{ChunkingConfig, ChunkingMode, validate_chunking_params};
use crate::progress::{ProgressEmitter, UploadEvent};
use crate::transport::{ChunkTransport, TransportError, UploadHeaders};
use crate::types::{Chunk, ProgressState, UploadSession};
use crate::TransferError;

/// Chunks held by pending uploads, as a multiple of the concurrency limit.
///
/// Once reached, the next completion is settled before another chunk is
/// read, which caps memory at roughly this many chunks.
const PENDING_WINDOW_FACTOR: usize = 2;

/// Per-upload parameters.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Storage token tag, e.g. `arweave`.
    pub token: String,
    /// Exact number of bytes the source will produce.
    pub total_byte_count: u64,
    /// Overrides [`ChunkingConfig::chunk_byte_count`].
    pub chunk_byte_count: Option<u64>,
    /// Overrides [`ChunkingConfig::max_concurrency`].
    pub max_concurrency: Option<usize>,
    /// Overrides [`ChunkingConfig::mode`] when picking the upload path.
    pub mode: Option<ChunkingMode>,
    /// Payer addresses sent as `x-paid-by`.
    pub paid_by: Vec<String>,
    /// Receives progress and error events.
    pub events: Option<ProgressEmitter>,
    /// Aborts every outstanding request when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl UploadOptions {
    pub fn new(token: impl Into<String>, total_byte_count: u64) -> Self {
        Self {
            token: token.into(),
            total_byte_count,
            ..Self::default()
        }
    }
}

/// Result of one chunk upload, reported back to the orchestrator.
struct ChunkOutcome {
    part_number: u64,
    offset: u64,
    byte_count: u64,
    result: Result<(), TransportError>,
}

/// Uploads payloads in chunks through an injected [`ChunkTransport`].
pub struct ChunkedUploader<T> {
    transport: T,
    config: ChunkingConfig,
}

impl<T: ChunkTransport> ChunkedUploader<T> {
    /// Creates an uploader, rejecting an out-of-range config.
    pub fn new(transport: T, config: ChunkingConfig) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Whether a payload of `total_byte_count` bytes should use this uploader.
    pub fn should_chunk(&self, total_byte_count: u64) -> Result<bool, TransferError> {
        self.config.decide(total_byte_count)
    }

    /// Uploads the payload produced by `source_factory` and finalizes it.
    ///
    /// The factory is only invoked once parameters are validated and the
    /// session is open. On failure an [`UploadEvent::UploadError`] is
    /// emitted and the session is abandoned without a close call.
    pub async fn upload<F, S>(
        &self,
        options: UploadOptions,
        source_factory: F,
    ) -> Result<ReconstructionResponse, TransferError>
    where
        F: FnOnce() -> S,
        S: ByteSource,
    {
        let events = options.events.clone().unwrap_or_default();
        let result = self.run(&options, &events, source_factory).await;
        if let Err(e) = &result {
            events.emit(&UploadEvent::UploadError {
                error: e.to_string(),
            });
        }
        result
    }

    async fn run<F, S>(
        &self,
        options: &UploadOptions,
        events: &ProgressEmitter,
        source_factory: F,
    ) -> Result<ReconstructionResponse, TransferError>
    where
        F: FnOnce() -> S,
        S: ByteSource,
    {
        let chunk_byte_count = options
            .chunk_byte_count
            .unwrap_or(self.config.chunk_byte_count);
        let max_concurrency = options
            .max_concurrency
            .unwrap_or(self.config.max_concurrency);
        validate_chunking_params(chunk_byte_count, max_concurrency)?;
        let chunk_size = usize::try_from(chunk_byte_count).map_err(|_| {
            TransferError::InvalidParameter(format!(
                "chunk byte count {chunk_byte_count} does not fit in memory"
            ))
        })?;
        if options.total_byte_count == 0 {
            return Err(TransferError::InvalidParameter(
                "an empty payload cannot be uploaded in chunks".into(),
            ));
        }

        let total = options.total_byte_count;
        let token = options.token.as_str();
        let cancel = options.cancel.clone().unwrap_or_default();
        let headers = UploadHeaders {
            paid_by: options.paid_by.clone(),
        };
        let mut session = UploadSession::new(token, chunk_byte_count, total);

        // 1. Open
        session.begin_open();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.fail();
                return Err(TransferError::Cancelled);
            }
            result = self.transport.open_session(token, chunk_byte_count) => result,
        };
        let opened = match opened {
            Ok(opened) => opened,
            Err(e) => {
                session.fail();
                return Err(TransferError::SessionOpen(e));
            }
        };
        if !opened.accepts_chunk_size(chunk_byte_count) {
            session.fail();
            return Err(TransferError::SessionOpen(TransportError::InvalidResponse(
                format!(
                    "server accepts chunks of {}..={} bytes, requested {chunk_byte_count}",
                    opened.min, opened.max
                ),
            )));
        }
        session.opened(opened.id);
        let session_id = session.session_id().to_string();
        info!(
            session_id = %session_id,
            token,
            chunk_bytes = chunk_byte_count,
            total_bytes = total,
            max_concurrency,
            "upload session opened"
        );

        // 2. Stream
        let limiter = ConcurrencyLimiter::new(max_concurrency);
        let window = max_concurrency.saturating_mul(PENDING_WINDOW_FACTOR);
        let mut splitter = ChunkSplitter::new(source_factory(), chunk_size);
        let mut pending = FuturesUnordered::new();
        let mut progress = ProgressState::new(total);
        let mut first_error: Option<TransferError> = None;
        let mut source_done = false;

        loop {
            let can_pull = !source_done && pending.len() < window;
            if !can_pull && pending.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    session.fail();
                    warn!(
                        session_id = %session_id,
                        in_flight = pending.len(),
                        "upload cancelled, abandoning session"
                    );
                    return Err(TransferError::Cancelled);
                }
                Some(outcome) = pending.next(), if !pending.is_empty() => {
                    settle(outcome, &mut progress, events, &mut first_error, &session_id);
                }
                next = splitter.next_chunk(), if can_pull => match next {
                    Ok(Some(payload)) => {
                        let end = session.next_offset() + payload.len() as u64;
                        if end > total {
                            source_done = true;
                            first_error.get_or_insert(TransferError::SizeMismatch {
                                expected: total,
                                actual: end,
                            });
                        } else {
                            let chunk = session.reserve(payload);
                            debug!(
                                session_id = %session_id,
                                part = chunk.part_number,
                                offset = chunk.offset,
                                bytes = chunk.byte_count,
                                "dispatching chunk"
                            );
                            pending.push(self.upload_chunk(
                                &limiter,
                                token,
                                &session_id,
                                &headers,
                                chunk,
                            ));
                        }
                    }
                    Ok(None) => {
                        source_done = true;
                        if session.next_offset() != total {
                            first_error.get_or_insert(TransferError::SizeMismatch {
                                expected: total,
                                actual: session.next_offset(),
                            });
                        }
                    }
                    Err(e) => {
                        source_done = true;
                        first_error.get_or_insert(TransferError::Source(e));
                    }
                },
            }
        }

        drop(pending);

        if let Some(err) = first_error {
            session.fail();
            warn!(session_id = %session_id, error = %err, "upload failed, session abandoned");
            return Err(err);
        }

        // Source drained, every chunk stored, no mismatch.
        debug_assert!(progress.is_complete());
        events.emit(&UploadEvent::UploadSuccess {
            total_bytes: progress.total_bytes,
        });

        // 3. Finalize
        session.begin_finalize();
        debug!(
            session_id = %session_id,
            chunks = session.dispatched_chunks(),
            "all chunks stored, finalizing"
        );
        let finalized = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.fail();
                return Err(TransferError::Cancelled);
            }
            result = self.transport.finalize(token, &session_id, &headers) => result,
        };

        match finalized {
            Ok(response) => {
                session.complete();
                info!(session_id = %session_id, id = %response.id, "upload finalized");
                Ok(response)
            }
            Err(source) => {
                session.fail();
                Err(TransferError::Finalize { session_id, source })
            }
        }
    }

    async fn upload_chunk(
        &self,
        limiter: &ConcurrencyLimiter,
        token: &str,
        session_id: &str,
        headers: &UploadHeaders,
        chunk: Chunk,
    ) -> ChunkOutcome {
        let Chunk {
            part_number,
            offset,
            byte_count,
            payload,
        } = chunk;
        let result = limiter
            .schedule(|| {
                self.transport
                    .put_chunk(token, session_id, offset, payload, headers)
            })
            .await;
        ChunkOutcome {
            part_number,
            offset,
            byte_count,
            result,
        }
    }
}

/// Applies a chunk outcome to the progress counters and emits its events.
fn settle(
    outcome: ChunkOutcome,
    progress: &mut ProgressState,
    events: &ProgressEmitter,
    first_error: &mut Option<TransferError>,
    session_id: &str,
) {
    match outcome.result {
        Ok(()) => {
            let processed_bytes = progress.record(outcome.byte_count);
            debug!(
                session_id,
                part = outcome.part_number,
                processed_bytes,
                "chunk stored"
            );
            events.emit(&UploadEvent::ChunkProgress {
                processed_bytes,
                total_bytes: progress.total_bytes,
            });
        }
        Err(error) => {
            warn!(
                session_id,
                part = outcome.part_number,
                offset = outcome.offset,
                error = %error,
                "chunk upload failed"
            );
            events.emit(&UploadEvent::ChunkError {
                part_number: outcome.part_number,
                offset: outcome.offset,
                byte_count: outcome.byte_count,
                error: error.clone(),
            });
            first_error.get_or_insert(TransferError::ChunkUpload {
                part_number: outcome.part_number,
                offset: outcome.offset,
                byte_count: outcome.byte_count,
                source: error,
            });
        }
    }
}
