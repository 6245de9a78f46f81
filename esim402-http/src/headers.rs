//! Header encoding and decoding for the storefront's x402 exchange.
//!
//! A paying client sends `authorization: Bearer x402-<token>`, where the
//! token is a Base64-encoded JSON [`PaymentProof`]. The server answers
//! unpaid requests with a `WWW-Authenticate: x402 ...` summary plus the
//! `X-Payment-*` headers.

use base64::prelude::*;
use esim402::{PaymentChallenge, PaymentProof};

use crate::constants::CREDENTIAL_PREFIX;
use crate::error::HttpError;

/// Encodes a [`PaymentProof`] as the Base64 credential token.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_proof(proof: &PaymentProof) -> Result<String, HttpError> {
    let json = serde_json::to_vec(proof)?;
    Ok(BASE64_STANDARD.encode(&json))
}

/// Decodes a credential token into a [`PaymentProof`].
///
/// # Errors
///
/// Returns [`HttpError`] on Base64 or JSON decode failure.
pub fn decode_payment_proof(token: &str) -> Result<PaymentProof, HttpError> {
    let bytes = BASE64_STANDARD.decode(token.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds the full `authorization` header value for `proof`.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn authorization_value(proof: &PaymentProof) -> Result<String, HttpError> {
    Ok(format!("{CREDENTIAL_PREFIX}{}", encode_payment_proof(proof)?))
}

/// Returns the credential token of an `authorization` header value.
///
/// The value must start with `Bearer x402-` and carry a non-empty token.
///
/// # Errors
///
/// Returns [`HttpError::InvalidCredential`] otherwise.
pub fn extract_credential(header_value: &str) -> Result<&str, HttpError> {
    header_value
        .strip_prefix(CREDENTIAL_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(HttpError::InvalidCredential)
}

/// Formats the `WWW-Authenticate` value advertising `challenge`.
///
/// `description` is the bare bundle description; the challenge's own
/// description carries the quantity suffix and stays in the JSON body.
#[must_use]
pub fn www_authenticate(challenge: &PaymentChallenge, description: &str) -> String {
    format!(
        "x402 amount={} currency={} description=\"{}\"",
        challenge.amount,
        challenge.currency,
        sanitize_description(description)
    )
}

/// Reduces free text to printable ASCII without double quotes or
/// backslashes, so that it can sit inside a quoted header parameter.
#[must_use]
pub fn sanitize_description(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '?'
            }
        })
        .filter(|c| *c != '"' && *c != '\\')
        .collect()
}
