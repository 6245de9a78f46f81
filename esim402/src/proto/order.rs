//! Order requests and responses exchanged with the eSIM provider.

use serde::{Deserialize, Serialize};

/// Whether an order request is a dry run or a real purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Check that the order would succeed without placing it.
    Validate,
    /// Place the order.
    Transaction,
}

/// Body of a provider `POST /orders` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Validate or commit.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Number of bundles.
    pub quantity: u32,
    /// Bundle name.
    pub item: String,
    /// Whether the provider should assign the bundle to an eSIM.
    pub assign: bool,
    /// Existing eSIM to top up; empty for a new profile.
    #[serde(default)]
    pub iccid: String,
    /// Optional provider profile id.
    #[serde(rename = "profileID", default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

impl OrderRequest {
    /// Builds an assigning order request for `quantity` units of `item`.
    #[must_use]
    pub fn new(order_type: OrderType, item: impl Into<String>, quantity: u32) -> Self {
        Self {
            order_type,
            quantity,
            item: item.into(),
            assign: true,
            iccid: String::new(),
            profile_id: None,
        }
    }

    /// Targets an existing eSIM.
    #[must_use]
    pub fn with_iccid(mut self, iccid: Option<String>) -> Self {
        self.iccid = iccid.unwrap_or_default();
        self
    }

    /// Sets the provider profile id.
    #[must_use]
    pub fn with_profile_id(mut self, profile_id: Option<String>) -> Self {
        self.profile_id = profile_id;
        self
    }

    /// Returns the same request with a different [`OrderType`].
    #[must_use]
    pub fn as_type(&self, order_type: OrderType) -> Self {
        Self {
            order_type,
            ..self.clone()
        }
    }
}

/// Provider response to an order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Provider status text.
    #[serde(default)]
    pub status_message: String,
    /// Provider-assigned order reference; empty for validations.
    #[serde(default)]
    pub order_reference: String,
    /// Number of eSIMs the order assigned.
    #[serde(default)]
    pub esims_assigned: u32,
    /// Order total as billed by the provider.
    #[serde(default)]
    pub total: f64,
    /// Currency of `total`.
    #[serde(default)]
    pub currency: String,
}

/// Settlement state reported back to the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The order was placed against the payment.
    Completed,
}

/// Payment section of a purchase receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    /// Amount charged, in minor units.
    pub amount: u64,
    /// ISO currency code.
    pub currency: String,
    /// Settlement state.
    pub status: PaymentStatus,
}

/// Body of a successful paid purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Always `true` on the success path.
    pub success: bool,
    /// The committed provider order.
    pub order: OrderResponse,
    /// What the payer was charged.
    pub payment: PaymentSummary,
    /// Human-readable status.
    #[serde(default)]
    pub message: String,
    /// Relative URL of the installation QR archive.
    pub qr_code_url: String,
}
