use bytes::BytesMut;
use tracing::info;
use turbo_protocol::ReconstructionResponse;
use turbo_transfer::{
    ByteSource, ChunkedUploader, ChunkingConfig, TransferError, UploadEvent, UploadHeaders,
    UploadOptions, decide,
};

use crate::{Error, HttpTransport};

/// Uploads signed payloads to an upload service.
///
/// Each call decides between a single request and a chunked session from
/// the configured [`turbo_transfer::ChunkingMode`] and the payload size.
pub struct UploadClient {
    uploader: ChunkedUploader<HttpTransport>,
}

impl UploadClient {
    pub fn new(base_url: &str, config: ChunkingConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(base_url)?;
        Ok(Self {
            uploader: ChunkedUploader::new(transport, config)?,
        })
    }

    pub fn transport(&self) -> &HttpTransport {
        self.uploader.transport()
    }

    pub fn config(&self) -> &ChunkingConfig {
        self.uploader.config()
    }

    /// Uploads the payload produced by `source_factory`.
    ///
    /// Per-call overrides in `options` take part in the chunking decision.
    pub async fn upload<F, S>(
        &self,
        options: UploadOptions,
        source_factory: F,
    ) -> Result<ReconstructionResponse, Error>
    where
        F: FnOnce() -> S,
        S: ByteSource,
    {
        let config = self.uploader.config();
        let chunked = decide(
            options.total_byte_count,
            options.chunk_byte_count.unwrap_or(config.chunk_byte_count),
            options.mode.unwrap_or(config.mode),
            options.max_concurrency.unwrap_or(config.max_concurrency),
        )?;

        if chunked {
            return Ok(self.uploader.upload(options, source_factory).await?);
        }

        let events = options.events.clone().unwrap_or_default();
        let result = self.upload_single(&options, source_factory).await;
        match &result {
            Ok(_) => events.emit(&UploadEvent::UploadSuccess {
                total_bytes: options.total_byte_count,
            }),
            Err(e) => events.emit(&UploadEvent::UploadError {
                error: e.to_string(),
            }),
        }
        result
    }

    async fn upload_single<F, S>(
        &self,
        options: &UploadOptions,
        source_factory: F,
    ) -> Result<ReconstructionResponse, Error>
    where
        F: FnOnce() -> S,
        S: ByteSource,
    {
        let cancel = options.cancel.clone().unwrap_or_default();
        let expected = options.total_byte_count;
        let mut source = source_factory();

        let mut buf = BytesMut::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled.into()),
                next = source.next_bytes() => next.map_err(TransferError::Source)?,
            };
            let Some(bytes) = next else { break };
            buf.extend_from_slice(&bytes);
            if buf.len() as u64 > expected {
                break;
            }
        }

        let actual = buf.len() as u64;
        if actual != expected {
            return Err(TransferError::SizeMismatch { expected, actual }.into());
        }

        info!(token = %options.token, bytes = actual, "uploading in a single request");
        let headers = UploadHeaders {
            paid_by: options.paid_by.clone(),
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransferError::Cancelled.into()),
            result = self.transport().upload_single(&options.token, buf.freeze(), &headers) => {
                Ok(result?)
            }
        }
    }
}
