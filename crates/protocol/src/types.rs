use serde::{Deserialize, Serialize};

/// Response to a session open request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpened {
    /// Session identifier used to address chunks and finalize.
    pub id: String,
    /// Smallest chunk size the server accepts (0 when not advertised).
    #[serde(default)]
    pub min: u64,
    /// Largest chunk size the server accepts (0 when not advertised).
    #[serde(default)]
    pub max: u64,
    /// Chunk size the server registered for this session.
    #[serde(default)]
    pub chunk_size: u64,
}

impl SessionOpened {
    /// Returns `true` if `chunk_byte_count` fits the advertised bounds.
    ///
    /// Missing bounds (zero) are treated as unbounded.
    pub fn accepts_chunk_size(&self, chunk_byte_count: u64) -> bool {
        (self.min == 0 || chunk_byte_count >= self.min)
            && (self.max == 0 || chunk_byte_count <= self.max)
    }
}

/// Server confirmation that a payload was stored, either directly or by
/// reassembling its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionResponse {
    /// Identifier of the stored payload.
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_caches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fast_finality_indexes: Vec<String>,
    /// Cost charged, in the token's smallest unit, as a decimal string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub winc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_height: Option<u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public: String,
}
