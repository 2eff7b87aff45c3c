//! HTTP side of the chunked upload engine.
//!
//! [`HttpTransport`] implements [`turbo_transfer::ChunkTransport`] with
//! `reqwest`; [`UploadClient`] picks between a single request and a
//! chunked session for each payload.

mod client;
mod transport;

#[cfg(test)]
mod test_server;

pub use client::UploadClient;
pub use transport::HttpTransport;

/// Default upload service URL.
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.ardrive.io/v1";

/// Errors from the upload client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Transfer(#[from] turbo_transfer::TransferError),

    #[error("upload failed: {0}")]
    Transport(#[from] turbo_transfer::TransportError),

    #[error("invalid upload URL: {0}")]
    InvalidUrl(String),
}
