use bytes::Bytes;
use tracing::debug;

/// A slice of the payload, addressed by its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position in dispatch order.
    pub part_number: u64,
    /// Byte offset within the original payload.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub byte_count: u64,
    /// Raw chunk data.
    pub payload: Bytes,
}

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Streaming,
    Finalizing,
    Completed,
    Failed,
}

impl SessionState {
    /// `true` once the session can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Client-side view of one chunked upload session.
///
/// Owned by the orchestrating task; nothing else writes to it. Offsets are
/// reserved when a chunk is dispatched, not when it completes, so
/// `next_offset` only moves forward and is never handed back on failure.
#[derive(Debug, Clone)]
pub struct UploadSession {
    session_id: String,
    token: String,
    chunk_byte_count: u64,
    total_byte_count: u64,
    next_offset: u64,
    next_part: u64,
    state: SessionState,
}

impl UploadSession {
    /// Creates an idle session for `token`.
    pub fn new(token: &str, chunk_byte_count: u64, total_byte_count: u64) -> Self {
        Self {
            session_id: String::new(),
            token: token.to_string(),
            chunk_byte_count,
            total_byte_count,
            next_offset: 0,
            next_part: 1,
            state: SessionState::Idle,
        }
    }

    /// Moves to [`SessionState::Opening`].
    pub fn begin_open(&mut self) {
        self.transition(SessionState::Opening);
    }

    /// Records the server-assigned id and starts streaming.
    pub fn opened(&mut self, session_id: String) {
        self.session_id = session_id;
        self.transition(SessionState::Streaming);
    }

    /// Reserves the next offset range for a chunk of `payload.len()` bytes.
    pub fn reserve(&mut self, payload: Bytes) -> Chunk {
        let byte_count = payload.len() as u64;
        let chunk = Chunk {
            part_number: self.next_part,
            offset: self.next_offset,
            byte_count,
            payload,
        };
        self.next_part += 1;
        self.next_offset += byte_count;
        chunk
    }

    /// Moves to [`SessionState::Finalizing`].
    pub fn begin_finalize(&mut self) {
        self.transition(SessionState::Finalizing);
    }

    pub fn complete(&mut self) {
        self.transition(SessionState::Completed);
    }

    pub fn fail(&mut self) {
        self.transition(SessionState::Failed);
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            session_id = %self.session_id,
            from = ?self.state,
            to = ?next,
            "session state change"
        );
        self.state = next;
    }

    /// Server-assigned session id (empty until opened).
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chunk_byte_count(&self) -> u64 {
        self.chunk_byte_count
    }

    pub fn total_byte_count(&self) -> u64 {
        self.total_byte_count
    }

    /// Offset the next dispatched chunk will get; equals bytes dispatched so far.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Number of chunks dispatched so far.
    pub fn dispatched_chunks(&self) -> u64 {
        self.next_part - 1
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
}

/// Bytes confirmed by the server so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl ProgressState {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            uploaded_bytes: 0,
            total_bytes,
        }
    }

    /// Adds a completed chunk and returns the new total.
    pub fn record(&mut self, byte_count: u64) -> u64 {
        self.uploaded_bytes += byte_count;
        self.uploaded_bytes
    }

    pub fn is_complete(&self) -> bool {
        self.uploaded_bytes == self.total_bytes
    }
}
