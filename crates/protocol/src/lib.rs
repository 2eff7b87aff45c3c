//! Wire types for the chunked upload endpoint.
//!
//! The endpoint is addressed by path: `/{token}/{session}/{offset}`, where
//! offset `-1` doubles as the "no offset" marker for session open and
//! finalize. See [`paths`] for the builders.

pub mod constants;
pub mod paths;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{
    CHUNKING_VERSION, HEADER_CHUNKING_VERSION, HEADER_PAID_BY, NO_OFFSET,
};
pub use types::{ReconstructionResponse, SessionOpened};
