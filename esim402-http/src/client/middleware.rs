//! Reqwest middleware that pays `402 Payment Required` responses.

use std::sync::Arc;

use esim402::proto::{ChallengeMetadata, PaymentChallenge};
use esim402::scheme::{PaymentError, PaymentHandler};
use http::header::AUTHORIZATION;
use http::{Extensions, HeaderMap, HeaderValue, StatusCode};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;
use serde::Deserialize;
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, trace};

use crate::constants::{X_PAYMENT_AMOUNT_HEADER, X_PAYMENT_CURRENCY_HEADER, X_PAYMENT_RECIPIENT_HEADER};
use crate::error::HttpError;
use crate::headers::authorization_value;

/// Errors raised while answering a 402.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The 402 response did not carry a usable challenge.
    #[error("Failed to parse payment challenge: {0}")]
    ParseError(String),
    /// No registered handler accepts the challenge.
    #[error("No payment handler accepts {currency} payments to {recipient}")]
    NoMatchingHandler {
        /// Challenge currency.
        currency: String,
        /// Challenge recipient.
        recipient: String,
    },
    /// The selected handler failed to produce a proof.
    #[error(transparent)]
    Payment(#[from] PaymentError),
    /// The proof could not be encoded as a header.
    #[error("Failed to encode payment credential: {0}")]
    Encoding(#[from] HttpError),
    /// The original request has a streaming body and cannot be replayed.
    #[error("Request is not cloneable, cannot retry with payment")]
    RequestNotCloneable,
}

/// Pays 402 challenges with the first handler that accepts them.
///
/// Handlers are tried in registration order. The original request is
/// retried exactly once with an `authorization: Bearer x402-...` header; the
/// retried response is returned whatever its status.
#[derive(Clone, Default)]
#[allow(missing_debug_implementations)] // dyn PaymentHandler does not implement Debug
pub struct X402Client {
    handlers: Vec<Arc<dyn PaymentHandler>>,
}

impl X402Client {
    /// Creates a client with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payment handler.
    #[must_use]
    pub fn register<H>(self, handler: H) -> Self
    where
        H: PaymentHandler + 'static,
    {
        self.register_arc(Arc::new(handler))
    }

    /// Registers a shared payment handler.
    #[must_use]
    pub fn register_arc(mut self, handler: Arc<dyn PaymentHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Produces the `authorization` header answering `challenge`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoMatchingHandler`] if no handler accepts the
    /// challenge, or the handler's failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.client.pay", skip_all, fields(amount = challenge.amount), err)
    )]
    pub async fn pay(&self, challenge: &PaymentChallenge) -> Result<HeaderMap, ClientError> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.accepts(challenge))
            .ok_or_else(|| ClientError::NoMatchingHandler {
                currency: challenge.currency.clone(),
                recipient: challenge.recipient.clone(),
            })?;

        #[cfg(feature = "telemetry")]
        debug!(handler = handler.name(), "Selected payment handler");

        let proof = handler.pay(challenge).await?;
        let value = authorization_value(&proof)?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ClientError::ParseError(format!("credential is not a header value: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Runs the next middleware or HTTP client with optional telemetry instrumentation.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "x402.client.next", skip_all)
)]
async fn run_next(
    next: rqm::Next<'_>,
    req: Request,
    extensions: &mut Extensions,
) -> rqm::Result<Response> {
    next.run(req, extensions).await
}

#[async_trait::async_trait]
impl rqm::Middleware for X402Client {
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.client.handle", skip_all, err)
    )]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone();
        let res = run_next(next.clone(), req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?res.status(), "No payment required, returning response");
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        info!(url = %res.url(), "Received 402 Payment Required, processing payment");

        let challenge = parse_payment_challenge(res)
            .await
            .ok_or_else(|| ClientError::ParseError("Invalid 402 response".to_owned()))
            .map_err(|e| rqm::Error::Middleware(e.into()))?;

        let headers = self
            .pay(&challenge)
            .await
            .map_err(|e| rqm::Error::Middleware(e.into()))?;

        let mut retry = retry_req.ok_or(rqm::Error::Middleware(
            ClientError::RequestNotCloneable.into(),
        ))?;
        retry.headers_mut().extend(headers);

        #[cfg(feature = "telemetry")]
        trace!(url = %retry.url(), "Retrying request with payment credential");

        run_next(next, retry, extensions).await
    }
}

#[derive(Deserialize)]
struct PaymentRequiredBody {
    payment: PaymentChallenge,
}

/// Extracts the [`PaymentChallenge`] from a 402 response.
///
/// Reads the JSON body's `payment` field, falling back to the
/// `X-Payment-Amount`, `X-Payment-Currency`, and `X-Payment-Recipient`
/// headers when the body is missing or unparsable.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "x402.client.parse_payment_challenge", skip(response))
)]
pub async fn parse_payment_challenge(response: Response) -> Option<PaymentChallenge> {
    let from_headers = challenge_from_headers(response.headers());
    let from_body = response
        .bytes()
        .await
        .ok()
        .and_then(|b| serde_json::from_slice::<PaymentRequiredBody>(&b).ok())
        .map(|body| body.payment);

    if from_body.is_some() {
        #[cfg(feature = "telemetry")]
        debug!("Parsed payment challenge from body");
        return from_body;
    }

    #[cfg(feature = "telemetry")]
    debug!(found = from_headers.is_some(), "Falling back to payment headers");

    from_headers
}

/// Rebuilds a challenge from the `X-Payment-*` headers alone.
fn challenge_from_headers(headers: &HeaderMap) -> Option<PaymentChallenge> {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let amount = get(X_PAYMENT_AMOUNT_HEADER)?.trim().parse().ok()?;
    let recipient = get(X_PAYMENT_RECIPIENT_HEADER)?.trim().to_owned();
    let currency = get(X_PAYMENT_CURRENCY_HEADER).unwrap_or("USD").trim().to_owned();
    Some(PaymentChallenge {
        amount,
        currency,
        description: String::new(),
        recipient,
        metadata: ChallengeMetadata::default(),
    })
}
