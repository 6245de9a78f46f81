//! Error responses of the storefront API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use esim402::pricing::PricingError;
use esim402::usage::WebhookError;
use esim402_http::server::{FulfillmentError, OrderError};
use serde::Serialize;

/// Errors a route handler can answer with.
///
/// Every variant renders as `{"error": ..., "details"?: ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body or query failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider call behind this route failed.
    #[error("{context}")]
    Upstream {
        /// Client-facing summary of what failed.
        context: &'static str,
        /// Underlying provider error.
        #[source]
        source: FulfillmentError,
    },

    /// The provider declined to validate an order.
    #[error("Order validation failed")]
    ValidationFailed,

    /// A paid order could not be fulfilled.
    #[error("Failed to create eSIM order")]
    Order(#[from] OrderError),

    /// The bundle's catalogue price could not be quoted.
    #[error("Failed to price bundle")]
    Pricing(#[from] PricingError),

    /// A usage webhook was rejected.
    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    /// Wraps a provider failure with a client-facing summary.
    #[must_use]
    pub const fn upstream(context: &'static str, source: FulfillmentError) -> Self {
        Self::Upstream { context, source }
    }

    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::ValidationFailed
            | Self::Webhook(WebhookError::Malformed(_)) => StatusCode::BAD_REQUEST,
            Self::Webhook(WebhookError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            Self::Upstream { .. } | Self::Order(_) | Self::Pricing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Upstream { source, .. } => Some(source.to_string()),
            Self::Order(err) => Some(err.to_string()),
            Self::Pricing(err) => Some(err.to_string()),
            Self::Webhook(WebhookError::Malformed(err)) => Some(err.to_string()),
            Self::InvalidInput(_)
            | Self::ValidationFailed
            | Self::Webhook(WebhookError::InvalidSignature) => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, details = ?self.details(), "Request failed");
        }
        let error = match &self {
            Self::Webhook(WebhookError::Malformed(_)) => "Invalid webhook payload".to_owned(),
            _ => self.to_string(),
        };
        let body = ErrorBody {
            error,
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}
