//! Error types for the header codec.

/// Errors that can occur while encoding or decoding x402 headers.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The header does not carry an x402 credential.
    #[error("missing or malformed x402 credential")]
    InvalidCredential,
}
