//! `reqwest` implementation of [`ChunkTransport`].

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::debug;
use turbo_protocol::{ReconstructionResponse, SessionOpened, constants::OCTET_STREAM, paths};
use turbo_transfer::{ChunkTransport, TransportError, TransportFuture, UploadHeaders};

use crate::Error;

/// Chunk endpoint client over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the upload service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("turbo-upload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(http, base_url)
    }

    /// Uses a preconfigured `reqwest` client (proxies, timeouts, retries).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Uploads a whole payload in one request.
    pub async fn upload_single(
        &self,
        token: &str,
        data: Bytes,
        headers: &UploadHeaders,
    ) -> Result<ReconstructionResponse, TransportError> {
        let url = self.url(&paths::single_upload_path(token));
        debug!(%url, bytes = data.len(), "single-request upload");
        let req = with_headers(self.http.post(&url), headers)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(data);
        let body = send(req).await?;
        decode(&body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ChunkTransport for HttpTransport {
    fn open_session<'a>(
        &'a self,
        token: &'a str,
        chunk_byte_count: u64,
    ) -> TransportFuture<'a, SessionOpened> {
        Box::pin(async move {
            let url = self.url(&paths::open_session_path(token, chunk_byte_count));
            let req = with_headers(self.http.get(&url), &UploadHeaders::default());
            let body = send(req).await?;
            decode(&body)
        })
    }

    fn put_chunk<'a>(
        &'a self,
        token: &'a str,
        session_id: &'a str,
        offset: u64,
        data: Bytes,
        headers: &'a UploadHeaders,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&paths::chunk_path(token, session_id, offset));
            let req = with_headers(self.http.post(&url), headers)
                .header(CONTENT_TYPE, OCTET_STREAM)
                .body(data);
            send(req).await?;
            Ok(())
        })
    }

    fn finalize<'a>(
        &'a self,
        token: &'a str,
        session_id: &'a str,
        headers: &'a UploadHeaders,
    ) -> TransportFuture<'a, ReconstructionResponse> {
        Box::pin(async move {
            let url = self.url(&paths::finalize_path(token, session_id));
            let req = with_headers(self.http.post(&url), headers);
            let body = send(req).await?;
            decode(&body)
        })
    }
}

fn with_headers(
    mut req: reqwest::RequestBuilder,
    headers: &UploadHeaders,
) -> reqwest::RequestBuilder {
    for (name, value) in headers.pairs() {
        req = req.header(name, value);
    }
    req
}

/// Sends a request and returns the body of a 2xx response.
async fn send(req: reqwest::RequestBuilder) -> Result<Bytes, TransportError> {
    let resp = req.send().await.map_err(request_error)?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    resp.bytes().await.map_err(request_error)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    serde_json::from_slice(body).map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request(e.to_string())
}
