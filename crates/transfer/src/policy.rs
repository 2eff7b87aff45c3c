//! Chunking decision and parameter validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_CHUNK_BYTE_COUNT, DEFAULT_MAX_CONCURRENCY, MAX_CHUNK_BYTE_COUNT,
    MIN_CHUNK_BYTE_COUNT, TransferError,
};

/// Whether a payload goes through the chunked upload path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMode {
    /// Chunk only payloads larger than two chunks.
    #[default]
    Auto,
    /// Always chunk.
    Force,
    /// Never chunk.
    Disabled,
}

impl ChunkingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Force => "force",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ChunkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingMode {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "force" => Ok(Self::Force),
            "disabled" => Ok(Self::Disabled),
            other => Err(TransferError::InvalidParameter(format!(
                "chunking mode must be one of auto, force, disabled (got {other:?})"
            ))),
        }
    }
}

/// Tunables for chunked uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Bytes per chunk; must lie within 5 MiB..=500 MiB.
    pub chunk_byte_count: u64,
    /// Maximum chunk uploads in flight.
    pub max_concurrency: usize,
    pub mode: ChunkingMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_byte_count: DEFAULT_CHUNK_BYTE_COUNT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            mode: ChunkingMode::Auto,
        }
    }
}

impl ChunkingConfig {
    /// Validates the chunk size and concurrency limit.
    pub fn validate(&self) -> Result<(), TransferError> {
        validate_chunking_params(self.chunk_byte_count, self.max_concurrency)
    }

    /// Shorthand for [`decide`] with this config.
    pub fn decide(&self, total_byte_count: u64) -> Result<bool, TransferError> {
        decide(
            total_byte_count,
            self.chunk_byte_count,
            self.mode,
            self.max_concurrency,
        )
    }
}

/// Rejects chunk sizes outside 5 MiB..=500 MiB and a zero concurrency limit.
pub fn validate_chunking_params(
    chunk_byte_count: u64,
    max_concurrency: usize,
) -> Result<(), TransferError> {
    if max_concurrency == 0 {
        return Err(TransferError::InvalidParameter(
            "max concurrency must be a positive integer".into(),
        ));
    }
    if !(MIN_CHUNK_BYTE_COUNT..=MAX_CHUNK_BYTE_COUNT).contains(&chunk_byte_count) {
        return Err(TransferError::InvalidParameter(format!(
            "chunk byte count must be between {MIN_CHUNK_BYTE_COUNT} and \
             {MAX_CHUNK_BYTE_COUNT} bytes (got {chunk_byte_count})"
        )));
    }
    Ok(())
}

/// Decides whether a payload of `total_byte_count` bytes should be chunked.
///
/// Pure: identical arguments always give identical results. In
/// [`ChunkingMode::Auto`], payloads of at most two chunks go as a single
/// request since session open + finalize would cost more than they save.
pub fn decide(
    total_byte_count: u64,
    chunk_byte_count: u64,
    mode: ChunkingMode,
    max_concurrency: usize,
) -> Result<bool, TransferError> {
    validate_chunking_params(chunk_byte_count, max_concurrency)?;

    Ok(match mode {
        ChunkingMode::Disabled => false,
        ChunkingMode::Force => true,
        ChunkingMode::Auto => total_byte_count > chunk_byte_count.saturating_mul(2),
    })
}
