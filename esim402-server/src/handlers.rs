//! Axum route handlers for the storefront.
//!
//! Catalogue and order routes proxy the eSIM provider. `/purchase` is gated
//! by x402: without a credential it answers `402 Payment Required` with the
//! quoted challenge, with one it places the order and returns a receipt.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use esim402::networks::SolanaNetwork;
use esim402::pricing;
use esim402::proto::{Bundle, BundleQuery, OrderRequest, OrderResponse, OrderType};
use esim402::usage::WebhookVerifier;
use esim402_http::constants::WEBHOOK_SIGNATURE_HEADER;
use esim402_http::server::paygate::EXPOSED_HEADERS;
use esim402_http::server::{Fulfillment, OrderOrchestrator, Paygate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors;

use crate::error::ApiError;

/// Shared application state for the storefront.
pub type StoreState = Arc<AppState>;

/// Everything a request handler needs.
#[allow(missing_debug_implementations)] // dyn Fulfillment does not implement Debug
pub struct AppState {
    /// Provider behind the catalogue and order routes.
    pub fulfillment: Arc<dyn Fulfillment>,
    /// Validate → commit flow for paid orders.
    pub orchestrator: OrderOrchestrator,
    /// Payment gate for `/purchase`.
    pub paygate: Paygate,
    /// Usage webhook signature check.
    pub verifier: WebhookVerifier,
    /// Cluster payments settle on.
    pub network: SolanaNetwork,
}

impl AppState {
    /// Wires the order flow onto `fulfillment`.
    #[must_use]
    pub fn new(
        fulfillment: Arc<dyn Fulfillment>,
        paygate: Paygate,
        verifier: WebhookVerifier,
        network: SolanaNetwork,
    ) -> Self {
        Self {
            orchestrator: OrderOrchestrator::new(Arc::clone(&fulfillment)),
            fulfillment,
            paygate,
            verifier,
            network,
        }
    }
}

const fn default_quantity() -> u32 {
    1
}

/// Body of the order and purchase routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    /// Catalogue bundle name.
    #[serde(default)]
    pub bundle_name: String,
    /// Number of bundles (default 1).
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Existing eSIM to top up.
    #[serde(default)]
    pub iccid: Option<String>,
    /// Provider profile id.
    #[serde(rename = "profileID", default)]
    pub profile_id: Option<String>,
}

impl OrderBody {
    fn validated(self) -> Result<Self, ApiError> {
        if self.bundle_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("Bundle name is required".to_owned()));
        }
        if self.quantity < 1 {
            return Err(ApiError::InvalidInput(
                "Quantity must be at least 1".to_owned(),
            ));
        }
        Ok(self)
    }

    fn order_request(&self, order_type: OrderType) -> OrderRequest {
        OrderRequest::new(order_type, self.bundle_name.trim(), self.quantity)
            .with_iccid(self.iccid.clone())
            .with_profile_id(self.profile_id.clone())
    }
}

fn order_body(body: Result<Json<OrderBody>, JsonRejection>) -> Result<OrderBody, ApiError> {
    let Json(body) = body?;
    body.validated()
}

#[derive(Serialize)]
struct OrderCreated {
    success: bool,
    order: OrderResponse,
    message: &'static str,
}

#[derive(Serialize)]
struct OrderValidated {
    success: bool,
    validation: OrderResponse,
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedUsage {
    iccid: String,
    bundle_name: String,
    remaining_quantity: f64,
    usage_percentage: i64,
}

#[derive(Serialize)]
struct WebhookAccepted {
    success: bool,
    message: &'static str,
    processed: ProcessedUsage,
}

/// `GET /bundles` - Lists catalogue bundles.
///
/// # Errors
///
/// Returns 400 on a malformed query, or 500 if the provider call fails.
pub async fn get_bundles(
    State(state): State<StoreState>,
    query: Result<Query<BundleQuery>, QueryRejection>,
) -> Result<Json<Vec<Bundle>>, ApiError> {
    let Query(query) = query?;
    let bundles = state
        .fulfillment
        .catalogue(&query)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch bundles", e))?;
    Ok(Json(bundles))
}

/// `POST /orders` - Places an order directly with the provider.
///
/// # Errors
///
/// Returns 400 on an invalid body, or 500 if the provider call fails.
pub async fn post_order(
    State(state): State<StoreState>,
    body: Result<Json<OrderBody>, JsonRejection>,
) -> Result<Json<impl Serialize>, ApiError> {
    let body = order_body(body)?;
    let order = state
        .fulfillment
        .create_order(&body.order_request(OrderType::Transaction))
        .await
        .map_err(|e| ApiError::upstream("Failed to create order", e))?;
    tracing::info!(
        order_reference = %order.order_reference,
        bundle = %body.bundle_name,
        quantity = body.quantity,
        "Created order"
    );
    Ok(Json(OrderCreated {
        success: true,
        order,
        message: "Order created successfully",
    }))
}

/// `GET /orders` - Reports the provider account balance.
pub async fn get_orders(State(state): State<StoreState>) -> Json<Value> {
    let balance = state.fulfillment.account_balance().await;
    Json(json!({
        "balance": balance,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /orders/validate` - Dry-runs an order.
///
/// # Errors
///
/// Returns 400 on an invalid body or when the provider declines, or 500 if
/// the provider call fails.
pub async fn post_validate(
    State(state): State<StoreState>,
    body: Result<Json<OrderBody>, JsonRejection>,
) -> Result<Json<impl Serialize>, ApiError> {
    let body = order_body(body)?;
    let validation = state
        .fulfillment
        .validate_order(&body.order_request(OrderType::Validate))
        .await
        .map_err(|e| ApiError::upstream("Failed to validate order", e))?
        .ok_or(ApiError::ValidationFailed)?;
    Ok(Json(OrderValidated {
        success: true,
        validation,
        message: "Order validated successfully",
    }))
}

/// `POST /purchase` - Sells a bundle for an x402 payment.
///
/// Prices the bundle, then either issues a payment challenge or, when the
/// request carries a credential, places the order.
///
/// # Errors
///
/// Returns 400 on an invalid body, or 500 if pricing or fulfillment fails.
pub async fn post_purchase(
    State(state): State<StoreState>,
    headers: HeaderMap,
    body: Result<Json<OrderBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = order_body(body)?;
    let bundle = state
        .fulfillment
        .bundle_details(body.bundle_name.trim())
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch bundle details", e))?;
    let quote = pricing::quote(&bundle, body.quantity)?;
    let description = if bundle.description.is_empty() {
        bundle.name.as_str()
    } else {
        bundle.description.as_str()
    };

    if let Err(required) = state.paygate.check(&headers, &quote, description) {
        return Ok(required.into_response());
    }

    let receipt = state.orchestrator.create_order(&quote).await?;
    tracing::info!(
        order_reference = %receipt.order.order_reference,
        amount = receipt.payment.amount,
        "Completed paid purchase"
    );
    Ok(Json(receipt).into_response())
}

/// `GET /qr/{order_reference}` - Streams the installation QR archive.
///
/// # Errors
///
/// Returns 500 if the provider call fails.
pub async fn get_qr_code(
    State(state): State<StoreState>,
    Path(order_reference): Path<String>,
) -> Result<Response, ApiError> {
    let archive = state
        .fulfillment
        .qr_code(&order_reference)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch QR code", e))?;
    let disposition = format!("attachment; filename=\"esim-{order_reference}.zip\"");
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    Ok((headers, archive).into_response())
}

/// `POST /webhook/esim` - Accepts a usage event from the provider.
///
/// # Errors
///
/// Returns 401 on a bad signature, or 400 on a malformed payload.
pub async fn post_usage_webhook(
    State(state): State<StoreState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<impl Serialize>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let report = state.verifier.process(&body, signature).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected usage webhook");
    })?;

    let usage_percentage = report.usage_percentage();
    let event = report.event;
    Ok(Json(WebhookAccepted {
        success: true,
        message: "Webhook processed successfully",
        processed: ProcessedUsage {
            iccid: event.iccid,
            bundle_name: event.bundle.name,
            remaining_quantity: event.bundle.remaining_quantity,
            usage_percentage,
        },
    }))
}

/// `GET /esims/{iccid}/bundles/{bundle_name}` - Bundle status on an eSIM.
///
/// # Errors
///
/// Returns 500 if the provider call fails.
pub async fn get_bundle_status(
    State(state): State<StoreState>,
    Path((iccid, bundle_name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .fulfillment
        .bundle_status(&iccid, &bundle_name)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch bundle status", e))?;
    Ok(Json(status))
}

/// `GET /health` - Liveness probe.
pub async fn health(State(state): State<StoreState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "network": state.network,
    }))
}

/// Creates an Axum [`Router`] with all storefront endpoints.
///
/// Endpoints:
/// - `GET /bundles` - catalogue listing
/// - `POST /orders`, `GET /orders` - direct order, account balance
/// - `POST /orders/validate` - order dry run
/// - `POST /purchase` - x402-gated purchase
/// - `GET /qr/{order_reference}` - QR archive
/// - `POST /webhook/esim` - usage webhook
/// - `GET /esims/{iccid}/bundles/{bundle_name}` - bundle status
/// - `GET /health` - liveness
pub fn store_router(state: StoreState) -> Router {
    let exposed = EXPOSED_HEADERS
        .iter()
        .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok());
    Router::new()
        .route("/bundles", get(get_bundles))
        .route("/orders", post(post_order).get(get_orders))
        .route("/orders/validate", post(post_validate))
        .route("/purchase", post(post_purchase))
        .route("/qr/{order_reference}", get(get_qr_code))
        .route("/webhook/esim", post(post_usage_webhook))
        .route("/esims/{iccid}/bundles/{bundle_name}", get(get_bundle_status))
        .route("/health", get(health))
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(cors::Any)
                .expose_headers(cors::ExposeHeaders::list(exposed)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use esim402::usage;
    use esim402_http::server::FulfillmentError;
    use esim402_http::server::fulfillment::BoxFuture;
    use tower::ServiceExt;

    use super::*;

    const SHOP: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    const SECRET: &str = "whsec";

    fn not_found(context: &'static str) -> FulfillmentError {
        FulfillmentError::UpstreamStatus {
            context,
            status: StatusCode::NOT_FOUND,
            body: "not found".to_owned(),
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        reject_validation: bool,
        commits: AtomicUsize,
        queries: Mutex<Vec<BundleQuery>>,
        orders: Mutex<Vec<OrderRequest>>,
    }

    fn bundle() -> Bundle {
        serde_json::from_value(json!({
            "name": "esim_1GB_7D_FR_V2",
            "description": "1GB, 7 Days, France",
            "price": 5.0,
        }))
        .unwrap()
    }

    impl Fulfillment for FakeProvider {
        fn catalogue<'a>(
            &'a self,
            query: &'a BundleQuery,
        ) -> BoxFuture<'a, Result<Vec<Bundle>, FulfillmentError>> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.clone());
                Ok(vec![bundle()])
            })
        }

        fn bundle_details<'a>(
            &'a self,
            name: &'a str,
        ) -> BoxFuture<'a, Result<Bundle, FulfillmentError>> {
            Box::pin(async move {
                if name == bundle().name {
                    Ok(bundle())
                } else {
                    Err(not_found("bundle details"))
                }
            })
        }

        fn validate_order<'a>(
            &'a self,
            request: &'a OrderRequest,
        ) -> BoxFuture<'a, Result<Option<OrderResponse>, FulfillmentError>> {
            Box::pin(async move {
                self.orders.lock().unwrap().push(request.clone());
                if self.reject_validation {
                    return Ok(None);
                }
                Ok(Some(OrderResponse {
                    status_message: "Validated".to_owned(),
                    order_reference: String::new(),
                    esims_assigned: 0,
                    total: 5.0,
                    currency: "USD".to_owned(),
                }))
            })
        }

        fn create_order<'a>(
            &'a self,
            request: &'a OrderRequest,
        ) -> BoxFuture<'a, Result<OrderResponse, FulfillmentError>> {
            Box::pin(async move {
                self.orders.lock().unwrap().push(request.clone());
                let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(OrderResponse {
                    status_message: "Order completed".to_owned(),
                    order_reference: format!("ord-{n}"),
                    esims_assigned: request.quantity,
                    total: 5.0,
                    currency: "USD".to_owned(),
                })
            })
        }

        fn qr_code<'a>(
            &'a self,
            order_reference: &'a str,
        ) -> BoxFuture<'a, Result<Vec<u8>, FulfillmentError>> {
            Box::pin(async move {
                if order_reference == "ord-1" {
                    Ok(b"PK\x03\x04zip".to_vec())
                } else {
                    Err(not_found("qr code"))
                }
            })
        }

        fn account_balance(&self) -> BoxFuture<'_, Option<Value>> {
            Box::pin(async { Some(json!({ "balance": 42.5, "currency": "USD" })) })
        }

        fn bundle_status<'a>(
            &'a self,
            iccid: &'a str,
            bundle_name: &'a str,
        ) -> BoxFuture<'a, Result<Value, FulfillmentError>> {
            Box::pin(async move { Ok(json!({ "iccid": iccid, "name": bundle_name, "state": "active" })) })
        }
    }

    fn app(provider: &Arc<FakeProvider>) -> Router {
        let state = AppState::new(
            provider.clone(),
            Paygate::new(SHOP),
            WebhookVerifier::new(Some(SECRET)),
            SolanaNetwork::Devnet,
        );
        store_router(Arc::new(state))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_bundles_forward_query() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::get("/bundles?page=2&perPage=10&countries=FR")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "esim_1GB_7D_FR_V2");
        let queries = provider.queries.lock().unwrap();
        assert_eq!(queries[0].page, 2);
        assert_eq!(queries[0].per_page, 10);
        assert_eq!(queries[0].countries.as_deref(), Some("FR"));
    }

    #[tokio::test]
    async fn test_order_requires_bundle_name() {
        let provider = Arc::new(FakeProvider::default());
        let (status, _, body) = send(app(&provider), post_json("/orders", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bundle name is required");

        let (status, _, _) = send(
            app(&provider),
            post_json("/orders", r#"{"bundleName":"esim_1GB_7D_FR_V2","quantity":0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(app(&provider), post_json("/orders", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(provider.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_is_placed() {
        let provider = Arc::new(FakeProvider::default());
        let (status, _, body) = send(
            app(&provider),
            post_json(
                "/orders",
                r#"{"bundleName":"esim_1GB_7D_FR_V2","iccid":"8944","profileID":"p1"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Order created successfully");
        assert_eq!(body["order"]["orderReference"], "ord-1");

        let orders = provider.orders.lock().unwrap();
        assert_eq!(orders[0].order_type, OrderType::Transaction);
        assert_eq!(orders[0].quantity, 1);
        assert_eq!(orders[0].iccid, "8944");
        assert_eq!(orders[0].profile_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_balance_and_timestamp() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::get("/orders").body(Body::empty()).unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"]["balance"], 42.5);
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_validate_order() {
        let provider = Arc::new(FakeProvider::default());
        let (status, _, body) = send(
            app(&provider),
            post_json("/orders/validate", r#"{"bundleName":"esim_1GB_7D_FR_V2"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["validation"]["statusMessage"], "Validated");
        assert_eq!(body["message"], "Order validated successfully");

        let rejecting = Arc::new(FakeProvider {
            reject_validation: true,
            ..FakeProvider::default()
        });
        let (status, _, body) = send(
            app(&rejecting),
            post_json("/orders/validate", r#"{"bundleName":"esim_1GB_7D_FR_V2"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Order validation failed");
    }

    #[tokio::test]
    async fn test_purchase_without_credential_is_challenged() {
        let provider = Arc::new(FakeProvider::default());
        let (status, headers, body) = send(
            app(&provider),
            post_json("/purchase", r#"{"bundleName":"esim_1GB_7D_FR_V2","quantity":2}"#),
        )
        .await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(headers["x-payment-required"], "true");
        assert_eq!(headers["x-payment-amount"], "1200");
        assert_eq!(body["error"], "Payment Required");
        assert_eq!(body["payment"]["amount"], 1200);
        assert_eq!(body["payment"]["recipient"], SHOP);
        assert_eq!(body["payment"]["description"], "1GB, 7 Days, France - 2x");
        assert_eq!(provider.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_purchase_with_wrong_scheme_is_challenged() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::post("/purchase")
            .header(CONTENT_TYPE, "application/json")
            .header("authorization", "Bearer abc")
            .body(Body::from(r#"{"bundleName":"esim_1GB_7D_FR_V2"}"#))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["payment"]["amount"], 600);
    }

    #[tokio::test]
    async fn test_paid_purchase_returns_receipt() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::post("/purchase")
            .header(CONTENT_TYPE, "application/json")
            .header("authorization", "Bearer x402-proof")
            .body(Body::from(r#"{"bundleName":"esim_1GB_7D_FR_V2"}"#))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["orderReference"], "ord-1");
        assert_eq!(body["payment"]["amount"], 600);
        assert_eq!(body["payment"]["status"], "completed");
        assert_eq!(body["qrCodeUrl"], "/qr/ord-1");

        let orders = provider.orders.lock().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_type, OrderType::Validate);
        assert_eq!(orders[1].order_type, OrderType::Transaction);
    }

    #[tokio::test]
    async fn test_paid_purchase_rejected_by_provider() {
        let provider = Arc::new(FakeProvider {
            reject_validation: true,
            ..FakeProvider::default()
        });
        let req = Request::post("/purchase")
            .header(CONTENT_TYPE, "application/json")
            .header("authorization", "Bearer x402-proof")
            .body(Body::from(r#"{"bundleName":"esim_1GB_7D_FR_V2"}"#))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to create eSIM order");
        assert!(body["details"].is_string());
        assert_eq!(provider.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_purchase_of_unknown_bundle() {
        let provider = Arc::new(FakeProvider::default());
        let (status, _, body) = send(
            app(&provider),
            post_json("/purchase", r#"{"bundleName":"nope"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch bundle details");
    }

    #[tokio::test]
    async fn test_qr_code_archive() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::get("/qr/ord-1").body(Body::empty()).unwrap();
        let res = app(&provider).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/zip");
        assert_eq!(
            res.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"esim-ord-1.zip\""
        );

        let req = Request::get("/qr/unknown").body(Body::empty()).unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch QR code");
    }

    fn usage_event() -> String {
        json!({
            "iccid": "8944500000000000001",
            "alertType": "",
            "bundle": {
                "name": "esim_1GB_7D_FR_V2",
                "initialQuantity": 10.0,
                "remainingQuantity": 2.0,
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_signed_webhook_is_processed() {
        let provider = Arc::new(FakeProvider::default());
        let body = usage_event();
        let signature = usage::sign(SECRET, body.as_bytes()).unwrap();
        let req = Request::post("/webhook/esim")
            .header(CONTENT_TYPE, "application/json")
            .header("x-signature", signature)
            .body(Body::from(body))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Webhook processed successfully");
        assert_eq!(body["processed"]["iccid"], "8944500000000000001");
        assert_eq!(body["processed"]["bundleName"], "esim_1GB_7D_FR_V2");
        assert_eq!(body["processed"]["remainingQuantity"], 2.0);
        assert_eq!(body["processed"]["usagePercentage"], 80);
    }

    #[tokio::test]
    async fn test_webhook_rejections() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::post("/webhook/esim")
            .header("x-signature", "Zm9v")
            .body(Body::from(usage_event()))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid signature");

        let req = Request::post("/webhook/esim")
            .body(Body::from(usage_event()))
            .unwrap();
        let (status, _, _) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let garbage = "{\"iccid\":";
        let signature = usage::sign(SECRET, garbage.as_bytes()).unwrap();
        let req = Request::post("/webhook/esim")
            .header("x-signature", signature)
            .body(Body::from(garbage))
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid webhook payload");
    }

    #[tokio::test]
    async fn test_bundle_status_and_health() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::get("/esims/8944/bundles/esim_1GB_7D_FR_V2")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["iccid"], "8944");
        assert_eq!(body["name"], "esim_1GB_7D_FR_V2");

        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, _, body) = send(app(&provider), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["network"], "devnet");
    }

    #[tokio::test]
    async fn test_cors_preflight_on_webhook() {
        let provider = Arc::new(FakeProvider::default());
        let req = Request::options("/webhook/esim")
            .header("origin", "https://shop.example")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type,x-signature")
            .body(Body::empty())
            .unwrap();
        let res = app(&provider).oneshot(req).await.unwrap();
        assert!(res.status().is_success());
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }
}
