/// Header carrying the chunking protocol version on every chunk request.
pub const HEADER_CHUNKING_VERSION: &str = "x-chunking-version";

/// Chunking protocol version spoken by this client.
pub const CHUNKING_VERSION: &str = "2";

/// Header attributing the upload cost to a payer address.
///
/// Sent once per payer; the server accepts the header repeated.
pub const HEADER_PAID_BY: &str = "x-paid-by";

/// Offset marker used for session open (`/{token}/-1/-1`) and finalize
/// (`/{token}/{session}/-1`).
pub const NO_OFFSET: i64 = -1;

/// Path segment of the chunk endpoint below the upload service URL.
pub const CHUNKS_SEGMENT: &str = "chunks";

/// Path segment of the single-request upload endpoint.
pub const TX_SEGMENT: &str = "tx";

/// Content type for raw payload bytes.
pub const OCTET_STREAM: &str = "application/octet-stream";
