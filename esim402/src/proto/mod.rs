//! Wire format types for the storefront.
//!
//! - [`catalogue`] - Bundles and catalogue queries, as returned by the provider
//! - [`order`] - Provider order requests and responses
//! - [`payment`] - 402 challenges, correlation ids, and payment proofs
//! - [`usage`] - Provider usage webhook payloads

pub mod catalogue;
pub mod order;
pub mod payment;
pub mod usage;

pub use catalogue::{BillingType, Bundle, BundleQuery, Country};
pub use order::{
    OrderRequest, OrderResponse, OrderType, PaymentStatus, PaymentSummary, PurchaseReceipt,
};
pub use payment::{ChallengeMetadata, OrderId, PaymentChallenge, PaymentIntent, PaymentProof};
pub use usage::{UsageBundle, UsageEvent};
