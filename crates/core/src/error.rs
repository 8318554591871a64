//! Core error types

use thiserror::Error;

/// Failure to read the claims embedded in a token
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Token is not a `header.payload.signature` triple
    #[error("Malformed token: expected 3 segments, found {0}")]
    Segments(usize),

    /// Payload segment is empty
    #[error("Malformed token: empty payload")]
    EmptyPayload,

    /// Payload is not valid base64url
    #[error("Invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Payload is not a JSON claims object
    #[error("Invalid claims: {0}")]
    Claims(#[from] serde_json::Error),
}
