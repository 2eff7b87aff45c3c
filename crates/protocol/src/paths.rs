//! Path builders for the chunk and single-request endpoints.
//!
//! All builders return paths relative to the upload service URL, e.g.
//! `/chunks/arweave/-1/-1?chunkSize=5242880`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::constants::{CHUNKS_SEGMENT, NO_OFFSET, TX_SEGMENT};

/// Unreserved characters (RFC 3986) stay as-is, everything else is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Path that opens a new chunked upload session.
pub fn open_session_path(token: &str, chunk_byte_count: u64) -> String {
    format!(
        "/{CHUNKS_SEGMENT}/{}/{NO_OFFSET}/{NO_OFFSET}?chunkSize={chunk_byte_count}",
        segment(token)
    )
}

/// Path addressing one chunk of a session by its byte offset.
pub fn chunk_path(token: &str, session_id: &str, offset: u64) -> String {
    format!(
        "/{CHUNKS_SEGMENT}/{}/{}/{offset}",
        segment(token),
        segment(session_id)
    )
}

/// Path that finalizes a session.
pub fn finalize_path(token: &str, session_id: &str) -> String {
    format!(
        "/{CHUNKS_SEGMENT}/{}/{}/{NO_OFFSET}",
        segment(token),
        segment(session_id)
    )
}

/// Path for uploading a whole payload in one request.
pub fn single_upload_path(token: &str) -> String {
    format!("/{TX_SEGMENT}/{}", segment(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_uses_no_offset_markers() {
        assert_eq!(
            open_session_path("arweave", 5 * 1024 * 1024),
            "/chunks/arweave/-1/-1?chunkSize=5242880"
        );
    }

    #[test]
    fn chunk_path_addresses_offset() {
        assert_eq!(
            chunk_path("arweave", "abc-123", 10_485_760),
            "/chunks/arweave/abc-123/10485760"
        );
    }

    #[test]
    fn finalize_uses_no_offset_marker() {
        assert_eq!(
            finalize_path("ario", "abc-123"),
            "/chunks/ario/abc-123/-1"
        );
    }

    #[test]
    fn single_upload_path_has_token() {
        assert_eq!(single_upload_path("solana"), "/tx/solana");
    }

    #[test]
    fn segments_are_escaped() {
        assert_eq!(
            chunk_path("base-eth", "a/b c", 0),
            "/chunks/base-eth/a%2Fb%20c/0"
        );
    }
}
