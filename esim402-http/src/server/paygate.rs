//! The 402 challenge responder.
//!
//! Each purchase request is either let through or answered
//! with a `402 Payment Required` carrying a fresh [`PaymentChallenge`]. No
//! state is kept between the challenge and the paid retry.
//!
//! Authorization only checks the credential's shape: the header must read
//! `Bearer x402-<token>` with a non-empty token. The token is decoded for
//! logging when possible but settlement is not verified here.

use axum_core::response::{IntoResponse, Response};
use esim402::pricing::PricingQuote;
use esim402::proto::{ChallengeMetadata, OrderId, PaymentChallenge, PaymentProof};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use super::error::VerificationError;
use crate::constants::{
    AUTHORIZATION_HEADER, PAYMENT_REQUIRED_ERROR, PAYMENT_REQUIRED_MESSAGE,
    WWW_AUTHENTICATE_HEADER, X_PAYMENT_AMOUNT_HEADER, X_PAYMENT_CURRENCY_HEADER,
    X_PAYMENT_RECIPIENT_HEADER, X_PAYMENT_REQUIRED_HEADER,
};
use crate::headers::{decode_payment_proof, extract_credential, www_authenticate};

/// A credential that passed the shape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCredential {
    token: String,
}

impl PaymentCredential {
    /// Raw token after the `Bearer x402-` prefix.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Decodes the token as a [`PaymentProof`], if it is one.
    #[must_use]
    pub fn proof(&self) -> Option<PaymentProof> {
        decode_payment_proof(&self.token).ok()
    }
}

/// Issues challenges payable to a fixed recipient.
#[derive(Debug, Clone)]
pub struct Paygate {
    recipient: String,
}

impl Paygate {
    /// Creates a paygate whose challenges name `recipient` as payee.
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }

    /// Payee address advertised in challenges.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Checks the request's `authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] if the header is absent, not UTF-8, or
    /// not a non-empty `Bearer x402-` credential.
    pub fn authorize(headers: &HeaderMap) -> Result<PaymentCredential, VerificationError> {
        let value = headers
            .get(AUTHORIZATION_HEADER)
            .ok_or(VerificationError::MissingCredential)?;
        let value = value
            .to_str()
            .map_err(|_| VerificationError::InvalidCredential)?;
        let token =
            extract_credential(value).map_err(|_| VerificationError::InvalidCredential)?;
        Ok(PaymentCredential {
            token: token.to_owned(),
        })
    }

    /// Builds a fresh challenge for `quote`.
    ///
    /// `description` is the bundle's catalogue description; the quantity is
    /// appended as `" - {n}x"`.
    #[must_use]
    pub fn challenge(&self, quote: &PricingQuote, description: &str) -> PaymentChallenge {
        PaymentChallenge {
            amount: quote.charge_minor_units,
            currency: quote.currency.clone(),
            description: format!("{description} - {}x", quote.quantity),
            recipient: self.recipient.clone(),
            metadata: ChallengeMetadata {
                bundle_name: quote.bundle_name.clone(),
                quantity: quote.quantity,
                order_id: Some(OrderId::generate()),
            },
        }
    }

    /// Authorizes the request or produces the 402 to send back.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentRequired`] when the request carries no usable credential.
    pub fn check(
        &self,
        headers: &HeaderMap,
        quote: &PricingQuote,
        description: &str,
    ) -> Result<PaymentCredential, PaymentRequired> {
        match Self::authorize(headers) {
            Ok(credential) => {
                #[cfg(feature = "telemetry")]
                match credential.proof() {
                    Some(proof) => tracing::info!(
                        payer = %proof.intent.payer,
                        amount = proof.intent.amount,
                        network = %proof.intent.network,
                        "Accepted x402 credential"
                    ),
                    None => tracing::info!("Accepted opaque x402 credential"),
                }
                Ok(credential)
            }
            Err(reason) => {
                let challenge = self.challenge(quote, description);
                #[cfg(not(feature = "telemetry"))]
                let _ = reason;
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    reason = %reason,
                    amount = challenge.amount,
                    order_id = ?challenge.metadata.order_id,
                    "Issuing payment challenge"
                );
                Err(PaymentRequired {
                    challenge,
                    description: description.to_owned(),
                })
            }
        }
    }
}

/// A `402 Payment Required` answer.
#[derive(Debug, Clone)]
pub struct PaymentRequired {
    /// Terms the client must satisfy.
    pub challenge: PaymentChallenge,
    /// Bundle description advertised in `WWW-Authenticate`, without the quantity.
    pub description: String,
}

#[derive(Serialize)]
struct PaymentRequiredBody<'a> {
    error: &'static str,
    payment: &'a PaymentChallenge,
    message: &'static str,
}

impl PaymentRequired {
    /// Headers advertising the challenge.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let challenge = &self.challenge;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(X_PAYMENT_REQUIRED_HEADER),
            HeaderValue::from_static("true"),
        );
        headers.insert(
            HeaderName::from_static(X_PAYMENT_AMOUNT_HEADER),
            HeaderValue::from(challenge.amount),
        );
        // free text and configuration may not be valid header values
        let optional = [
            (
                HeaderName::from_static(WWW_AUTHENTICATE_HEADER),
                www_authenticate(challenge, &self.description),
            ),
            (
                HeaderName::from_static(X_PAYMENT_CURRENCY_HEADER),
                challenge.currency.clone(),
            ),
            (
                HeaderName::from_static(X_PAYMENT_RECIPIENT_HEADER),
                challenge.recipient.clone(),
            ),
        ];
        for (name, value) in optional {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

impl IntoResponse for PaymentRequired {
    fn into_response(self) -> Response {
        let body = PaymentRequiredBody {
            error: PAYMENT_REQUIRED_ERROR,
            payment: &self.challenge,
            message: PAYMENT_REQUIRED_MESSAGE,
        };
        match serde_json::to_vec(&body) {
            Ok(body) => (StatusCode::PAYMENT_REQUIRED, self.headers(), body).into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Header names a browser client must be allowed to read on a 402.
pub const EXPOSED_HEADERS: [&str; 5] = [
    WWW_AUTHENTICATE_HEADER,
    X_PAYMENT_REQUIRED_HEADER,
    X_PAYMENT_AMOUNT_HEADER,
    X_PAYMENT_CURRENCY_HEADER,
    X_PAYMENT_RECIPIENT_HEADER,
];
