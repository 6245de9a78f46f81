//! Client for the eSIM provisioning API.
//!
//! [`FulfillmentClient`] is a thin, typed wrapper over the provider's REST
//! endpoints. Handlers depend on the [`Fulfillment`] trait instead, so tests
//! can swap in an in-memory provider.
//!
//! Every request carries the `X-API-Key` header and a per-request timeout.
//! Non-2xx responses surface as [`FulfillmentError::UpstreamStatus`] with
//! the provider's body text.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use esim402::proto::{Bundle, BundleQuery, OrderRequest, OrderResponse};
use http::header::{ACCEPT, InvalidHeaderValue};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Boxed future returned by [`Fulfillment`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default base URL of the provider API.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.esim-go.com/v2.4";

/// Operations the storefront needs from the eSIM provider.
pub trait Fulfillment: Send + Sync {
    /// Lists catalogue bundles matching `query`.
    fn catalogue<'a>(
        &'a self,
        query: &'a BundleQuery,
    ) -> BoxFuture<'a, Result<Vec<Bundle>, FulfillmentError>>;

    /// Fetches a single bundle by name.
    fn bundle_details<'a>(&'a self, name: &'a str)
    -> BoxFuture<'a, Result<Bundle, FulfillmentError>>;

    /// Dry-runs an order. `None` means the provider rejected it without an error status.
    fn validate_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, Result<Option<OrderResponse>, FulfillmentError>>;

    /// Places an order.
    fn create_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, Result<OrderResponse, FulfillmentError>>;

    /// Downloads the installation QR archive (a zip) for an order.
    fn qr_code<'a>(&'a self, order_reference: &'a str)
    -> BoxFuture<'a, Result<Vec<u8>, FulfillmentError>>;

    /// Returns the provider account balance, or `None` if it could not be read.
    fn account_balance(&self) -> BoxFuture<'_, Option<Value>>;

    /// Returns the status of `bundle_name` on the eSIM `iccid`.
    fn bundle_status<'a>(
        &'a self,
        iccid: &'a str,
        bundle_name: &'a str,
    ) -> BoxFuture<'a, Result<Value, FulfillmentError>>;
}

/// Errors that can occur while talking to the provider.
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The base URL cannot carry path segments.
    #[error("base URL cannot be a base: {0}")]
    InvalidBaseUrl(Url),
    /// The API key is not a valid header value.
    #[error("invalid API key: {0}")]
    InvalidApiKey(#[from] InvalidHeaderValue),
    /// HTTP transport error, including timeouts.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The provider answered with a non-2xx status.
    #[error("eSIM provider error {status}: {context}: {body}")]
    UpstreamStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// The provider answers either `{"bundles": [..]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogueResponse {
    Wrapped { bundles: Vec<Bundle> },
    Bare(Vec<Bundle>),
}

impl CatalogueResponse {
    fn into_bundles(self) -> Vec<Bundle> {
        match self {
            Self::Wrapped { bundles } | Self::Bare(bundles) => bundles,
        }
    }
}

/// HTTP client for the eSIM Go REST API.
#[derive(Clone, Debug)]
pub struct FulfillmentClient {
    /// Base URL, e.g. `https://api.esim-go.com/v2.4`
    base_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Headers sent with every request (always includes `X-API-Key`)
    headers: HeaderMap,
    /// Per-request timeout
    timeout: Duration,
}

impl FulfillmentClient {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a client for the provider at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] if the URL does not parse or the API key
    /// is not a valid header value.
    pub fn try_new(base_url: &str, api_key: &str) -> Result<Self, FulfillmentError> {
        let base_url = Url::parse(base_url.trim()).map_err(|e| FulfillmentError::UrlParse {
            context: "Failed to parse provider base url",
            source: e,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FulfillmentError::InvalidBaseUrl(base_url));
        }
        let mut api_key = HeaderValue::from_str(api_key)?;
        api_key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-api-key"), api_key);
        Ok(Self {
            base_url,
            client: Client::new(),
            headers,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Returns the base URL used by this client.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-request timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses a preconfigured reqwest client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// `GET /catalogue`
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport, status, or decoding failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.catalogue", skip_all, fields(page = query.page))
    )]
    pub async fn catalogue(&self, query: &BundleQuery) -> Result<Vec<Bundle>, FulfillmentError> {
        const CONTEXT: &str = "GET /catalogue";
        let mut url = self.endpoint(&["catalogue"])?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        let result = async {
            let res = self.send(self.client.get(url), CONTEXT).await?;
            let page: CatalogueResponse = read_json(res, CONTEXT).await?;
            Ok(page.into_bundles())
        }
        .await;
        record_result_on_span(&result);
        result
    }

    /// `GET /catalogue/{name}`
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport, status, or decoding failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.bundle_details", skip(self))
    )]
    pub async fn bundle_details(&self, name: &str) -> Result<Bundle, FulfillmentError> {
        let url = self.endpoint(&["catalogue", name])?;
        self.get_json(url, "GET /catalogue/{name}").await
    }

    /// `POST /orders` with `type: validate`.
    ///
    /// An empty, `null`, or `false` body maps to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport, status, or decoding failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.validate_order", skip_all, fields(item = %request.item))
    )]
    pub async fn validate_order(
        &self,
        request: &OrderRequest,
    ) -> Result<Option<OrderResponse>, FulfillmentError> {
        const CONTEXT: &str = "POST /orders (validate)";
        let url = self.endpoint(&["orders"])?;
        let request = request.as_type(esim402::proto::OrderType::Validate);
        let result = async {
            let res = self.send(self.client.post(url).json(&request), CONTEXT).await?;
            let bytes = res
                .bytes()
                .await
                .map_err(|e| FulfillmentError::ResponseBodyRead {
                    context: CONTEXT,
                    source: e,
                })?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                FulfillmentError::JsonDeserialization {
                    context: CONTEXT,
                    source: e,
                }
            })?;
            match value {
                Value::Null | Value::Bool(false) => Ok(None),
                value => serde_json::from_value(value).map(Some).map_err(|e| {
                    FulfillmentError::JsonDeserialization {
                        context: CONTEXT,
                        source: e,
                    }
                }),
            }
        }
        .await;
        record_result_on_span(&result);
        result
    }

    /// `POST /orders` with `type: transaction`.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport, status, or decoding failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.create_order", skip_all, fields(item = %request.item, quantity = request.quantity))
    )]
    pub async fn create_order(
        &self,
        request: &OrderRequest,
    ) -> Result<OrderResponse, FulfillmentError> {
        const CONTEXT: &str = "POST /orders (transaction)";
        let url = self.endpoint(&["orders"])?;
        let request = request.as_type(esim402::proto::OrderType::Transaction);
        let result = async {
            let res = self.send(self.client.post(url).json(&request), CONTEXT).await?;
            read_json(res, CONTEXT).await
        }
        .await;
        record_result_on_span(&result);
        result
    }

    /// `GET /esimsassignments/{orderReference}` as `application/zip`.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport or status failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.qr_code", skip(self))
    )]
    pub async fn qr_code(&self, order_reference: &str) -> Result<Vec<u8>, FulfillmentError> {
        const CONTEXT: &str = "GET /esimsassignments/{orderReference}";
        let url = self.endpoint(&["esimsassignments", order_reference])?;
        let result = async {
            let req = self
                .client
                .get(url)
                .header(ACCEPT, HeaderValue::from_static("application/zip"));
            let res = self.send(req, CONTEXT).await?;
            let bytes = res
                .bytes()
                .await
                .map_err(|e| FulfillmentError::ResponseBodyRead {
                    context: CONTEXT,
                    source: e,
                })?;
            Ok(bytes.to_vec())
        }
        .await;
        record_result_on_span(&result);
        result
    }

    /// `GET /account/balance`, degrading to `None` on any failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.account_balance", skip_all)
    )]
    pub async fn account_balance(&self) -> Option<Value> {
        let result = match self.endpoint(&["account", "balance"]) {
            Ok(url) => self.get_json::<Value>(url, "GET /account/balance").await,
            Err(err) => Err(err),
        };
        #[cfg(feature = "telemetry")]
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Failed to fetch account balance");
        }
        result.ok()
    }

    /// `GET /esims/{iccid}/bundles/{name}`
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`] on transport, status, or decoding failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "esim_go.bundle_status", skip(self))
    )]
    pub async fn bundle_status(
        &self,
        iccid: &str,
        bundle_name: &str,
    ) -> Result<Value, FulfillmentError> {
        let url = self.endpoint(&["esims", iccid, "bundles", bundle_name])?;
        self.get_json(url, "GET /esims/{iccid}/bundles/{name}").await
    }

    /// Appends percent-encoded `segments` to the base URL path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FulfillmentError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FulfillmentError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Applies headers and timeout, sends, and maps non-2xx statuses.
    async fn send(
        &self,
        req: RequestBuilder,
        context: &'static str,
    ) -> Result<Response, FulfillmentError> {
        let res = req
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FulfillmentError::Http { context, source: e })?;
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FulfillmentError::ResponseBodyRead { context, source: e })?;
        Err(FulfillmentError::UpstreamStatus {
            context,
            status,
            body,
        })
    }

    /// Generic GET helper.
    ///
    /// `context` is a human-readable identifier used in tracing and error messages.
    async fn get_json<R>(&self, url: Url, context: &'static str) -> Result<R, FulfillmentError>
    where
        R: DeserializeOwned,
    {
        let result = async {
            let res = self.send(self.client.get(url), context).await?;
            read_json(res, context).await
        }
        .await;
        record_result_on_span(&result);
        result
    }
}

async fn read_json<R: DeserializeOwned>(
    res: Response,
    context: &'static str,
) -> Result<R, FulfillmentError> {
    let bytes = res
        .bytes()
        .await
        .map_err(|e| FulfillmentError::ResponseBodyRead { context, source: e })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FulfillmentError::JsonDeserialization { context, source: e })
}

impl Fulfillment for FulfillmentClient {
    fn catalogue<'a>(
        &'a self,
        query: &'a BundleQuery,
    ) -> BoxFuture<'a, Result<Vec<Bundle>, FulfillmentError>> {
        Box::pin(Self::catalogue(self, query))
    }

    fn bundle_details<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Bundle, FulfillmentError>> {
        Box::pin(Self::bundle_details(self, name))
    }

    fn validate_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, Result<Option<OrderResponse>, FulfillmentError>> {
        Box::pin(Self::validate_order(self, request))
    }

    fn create_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, Result<OrderResponse, FulfillmentError>> {
        Box::pin(Self::create_order(self, request))
    }

    fn qr_code<'a>(
        &'a self,
        order_reference: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, FulfillmentError>> {
        Box::pin(Self::qr_code(self, order_reference))
    }

    fn account_balance(&self) -> BoxFuture<'_, Option<Value>> {
        Box::pin(Self::account_balance(self))
    }

    fn bundle_status<'a>(
        &'a self,
        iccid: &'a str,
        bundle_name: &'a str,
    ) -> BoxFuture<'a, Result<Value, FulfillmentError>> {
        Box::pin(Self::bundle_status(self, iccid, bundle_name))
    }
}

/// Logs a failed provider request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "Request to eSIM provider failed");
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
const fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
