//! Paying purchase service for storefront clients.
//!
//! Wraps the storefront's `POST /purchase` endpoint behind an
//! [`X402Client`], so a purchase either succeeds outright or is paid and
//! retried transparently.

use std::sync::Arc;

use esim402::pricing::{PricingError, PricingQuote, quote};
use esim402::proto::{Bundle, PurchaseReceipt};
use esim402::scheme::PaymentHandler;
use http::StatusCode;
use reqwest::Client;
use reqwest_middleware as rqm;
use serde::Serialize;
use url::Url;

use super::middleware::{ClientError, X402Client};
use super::{ReqwestWithPayments, ReqwestWithPaymentsBuild};

/// Errors returned by [`PurchaseClient`].
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// No handler is initialized or its wallet is disconnected.
    #[error("Wallet not connected or payment service not ready")]
    NotReady,
    /// The payment step failed; the purchase was not retried.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    /// The storefront answered the (possibly paid) request with an error.
    #[error("Purchase failed with status {status}: {body}")]
    Rejected {
        /// Final HTTP status.
        status: StatusCode,
        /// Response body text.
        body: String,
    },
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[source] rqm::Error),
    /// The response body could not be read or was not a purchase receipt.
    #[error("Invalid purchase response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
    /// The storefront URL is invalid.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<rqm::Error> for PurchaseError {
    fn from(err: rqm::Error) -> Self {
        match err {
            rqm::Error::Middleware(inner) => match inner.downcast::<ClientError>() {
                Ok(client_err) => Self::PaymentFailed(client_err.to_string()),
                Err(other) => Self::Http(rqm::Error::Middleware(other)),
            },
            other => Self::Http(other),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest<'a> {
    bundle_name: &'a str,
    quantity: u32,
}

/// Buys bundles from a storefront, paying 402 challenges on the way.
#[allow(missing_debug_implementations)] // dyn PaymentHandler does not implement Debug
pub struct PurchaseClient {
    purchase_url: Url,
    http: Client,
    handler: Option<Arc<dyn PaymentHandler>>,
    client: Option<rqm::ClientWithMiddleware>,
}

impl PurchaseClient {
    /// Creates an uninitialized client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::UrlParse`] if the URL is invalid.
    pub fn try_new(base_url: &str) -> Result<Self, PurchaseError> {
        let mut normalized = base_url.trim_end_matches('/').to_owned();
        normalized.push('/');
        let purchase_url = Url::parse(&normalized)?.join("purchase")?;
        Ok(Self {
            purchase_url,
            http: Client::new(),
            handler: None,
            client: None,
        })
    }

    /// Uses a preconfigured reqwest client for all requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Installs `handler` as the payer.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::NotReady`] if the handler's wallet is not connected.
    pub fn initialize(&mut self, handler: Arc<dyn PaymentHandler>) -> Result<(), PurchaseError> {
        if !handler.is_ready() {
            return Err(PurchaseError::NotReady);
        }
        let x402 = X402Client::new().register_arc(Arc::clone(&handler));
        self.client = Some(self.http.clone().with_payments(x402).build());
        self.handler = Some(handler);
        Ok(())
    }

    /// Returns `true` once initialized with a handler whose wallet is still connected.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handler.as_ref().is_some_and(|h| h.is_ready()) && self.client.is_some()
    }

    /// Buys `quantity` units of `bundle_name`.
    ///
    /// # Errors
    ///
    /// - [`PurchaseError::NotReady`] before any network call if uninitialized
    ///   or the wallet has disconnected.
    /// - [`PurchaseError::PaymentFailed`] if the payment step failed.
    /// - [`PurchaseError::Rejected`] if the final response is not a success.
    /// - [`PurchaseError::InvalidResponse`] if the response body cannot be
    ///   read or decoded.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "purchase.data_plan", skip(self), err)
    )]
    pub async fn purchase_data_plan(
        &self,
        bundle_name: &str,
        quantity: u32,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let client = match (&self.client, &self.handler) {
            (Some(client), Some(handler)) if handler.is_ready() => client,
            _ => return Err(PurchaseError::NotReady),
        };

        let res = client
            .post(self.purchase_url.clone())
            .json(&PurchaseRequest {
                bundle_name,
                quantity,
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.map_err(PurchaseError::InvalidResponse)?;
            return Err(PurchaseError::Rejected { status, body });
        }
        res.json::<PurchaseReceipt>()
            .await
            .map_err(PurchaseError::InvalidResponse)
    }

    /// Payer-facing price of `quantity` units of `bundle`, in cents.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] for a zero quantity or an invalid price.
    pub fn calculate_payment_amount(
        bundle: &Bundle,
        quantity: u32,
    ) -> Result<PricingQuote, PricingError> {
        quote(bundle, quantity)
    }
}
