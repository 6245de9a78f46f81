#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the x402 eSIM storefront.
//!
//! This crate holds everything in the purchase protocol that does not touch
//! the network: turning a catalogue price into a payer-facing charge, the
//! JSON shapes exchanged with browsers and with the eSIM provisioning API,
//! the payment handler abstraction used by paying clients, and the
//! verification/classification of provider usage webhooks.
//!
//! # Modules
//!
//! - [`networks`] - Solana cluster selection
//! - [`pricing`] - Markup pricing in integer minor units
//! - [`proto`] - Wire format types (catalogue, orders, challenges, proofs, usage)
//! - [`scheme`] - Client-side payment handler trait and errors
//! - [`usage`] - HMAC verification and classification of usage webhooks
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing of webhook alerts

pub mod networks;
pub mod pricing;
pub mod proto;
pub mod scheme;
pub mod usage;

pub use pricing::{PricingError, PricingQuote, quote};
pub use proto::{
    Bundle, ChallengeMetadata, OrderId, OrderRequest, OrderResponse, PaymentChallenge,
    PaymentProof, UsageEvent,
};
