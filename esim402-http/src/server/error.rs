//! Error types for the server-side purchase path.

use super::fulfillment::FulfillmentError;

/// Why a request was not let through the paygate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// No `authorization` header.
    #[error("authorization header is required")]
    MissingCredential,
    /// The header is present but is not an x402 credential.
    #[error("invalid or malformed x402 credential")]
    InvalidCredential,
}

/// Errors from the validate → commit order flow.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The provider's dry run returned nothing; the order was not placed.
    #[error("Order validation failed for bundle '{bundle_name}'")]
    ValidationFailed {
        /// Bundle that failed validation.
        bundle_name: String,
    },
    /// The provider call failed.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}
