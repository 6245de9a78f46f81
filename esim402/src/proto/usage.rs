//! Usage events pushed by the eSIM provider.

use serde::{Deserialize, Serialize};

/// Snapshot of a bundle's consumption at the time of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBundle {
    /// Provider bundle id.
    #[serde(default)]
    pub id: String,
    /// Provider reference.
    #[serde(default)]
    pub reference: String,
    /// Bundle name.
    pub name: String,
    /// Bundle description.
    #[serde(default)]
    pub description: String,
    /// Allotment at activation.
    pub initial_quantity: f64,
    /// Allotment left.
    pub remaining_quantity: f64,
    /// Activation time, as sent by the provider.
    #[serde(default)]
    pub start_time: String,
    /// Expiry time, as sent by the provider.
    #[serde(default)]
    pub end_time: String,
    /// Whether the bundle is unlimited.
    #[serde(default)]
    pub unlimited: bool,
}

/// A usage webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    /// Profile the usage belongs to.
    pub iccid: String,
    /// Provider alert tag, e.g. `"depleted"`.
    #[serde(default)]
    pub alert_type: String,
    /// Bundle snapshot.
    pub bundle: UsageBundle,
}
