//! Validate-then-commit ordering against the provider.
//!
//! Runs only after the paygate has authorized the request. The provider's
//! dry run must succeed before the real order is placed. There is no
//! compensation if the commit fails after a successful validation, and the
//! flow is not idempotent: every call places a new provider order.

use std::sync::Arc;

use esim402::pricing::PricingQuote;
use esim402::proto::{
    OrderRequest, OrderType, PaymentStatus, PaymentSummary, PurchaseReceipt,
};

use super::error::OrderError;
use super::fulfillment::Fulfillment;

/// Message attached to every successful receipt.
pub const ORDER_CREATED_MESSAGE: &str = "Order created successfully";

/// Relative URL serving the QR archive of `order_reference`.
#[must_use]
pub fn qr_code_url(order_reference: &str) -> String {
    format!("/qr/{order_reference}")
}

/// Places paid orders with the provider.
#[derive(Clone)]
#[allow(missing_debug_implementations)] // dyn Fulfillment does not implement Debug
pub struct OrderOrchestrator {
    fulfillment: Arc<dyn Fulfillment>,
}

impl OrderOrchestrator {
    /// Creates an orchestrator over `fulfillment`.
    pub fn new(fulfillment: Arc<dyn Fulfillment>) -> Self {
        Self { fulfillment }
    }

    /// Validates and commits the order described by `quote`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::ValidationFailed`] without placing an order if
    /// the dry run comes back empty, or [`OrderError::Fulfillment`] if either
    /// provider call fails.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(
            name = "orders.create",
            skip_all,
            fields(bundle = %quote.bundle_name, quantity = quote.quantity),
            err
        )
    )]
    pub async fn create_order(&self, quote: &PricingQuote) -> Result<PurchaseReceipt, OrderError> {
        let request = OrderRequest::new(OrderType::Validate, &quote.bundle_name, quote.quantity);

        if self.fulfillment.validate_order(&request).await?.is_none() {
            return Err(OrderError::ValidationFailed {
                bundle_name: quote.bundle_name.clone(),
            });
        }

        let commit = request.as_type(OrderType::Transaction);
        let order = match self.fulfillment.create_order(&commit).await {
            Ok(order) => order,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    error = %err,
                    "Order commit failed after successful validation; payment was accepted"
                );
                return Err(err.into());
            }
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(reference = %order.order_reference, "Order committed");

        Ok(PurchaseReceipt {
            success: true,
            qr_code_url: qr_code_url(&order.order_reference),
            order,
            payment: PaymentSummary {
                amount: quote.charge_minor_units,
                currency: quote.currency.clone(),
                status: PaymentStatus::Completed,
            },
            message: ORDER_CREATED_MESSAGE.to_owned(),
        })
    }
}
