#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the x402 eSIM storefront.
//!
//! Provides the header codec shared by both sides of the 402 exchange and,
//! behind feature flags, the server-side purchase plumbing and the paying
//! client.
//!
//! # Modules
//!
//! - [`constants`] - Header names and the credential prefix
//! - [`headers`] - Proof encoding, credential extraction, `WWW-Authenticate`
//! - [`error`] - Header codec errors
//! - [`server`] - Provider client, 402 responder, order orchestration (feature: `server`)
//! - [`client`] - Reqwest middleware that pays 402 challenges (feature: `client`)
//!
//! # Feature Flags
//!
//! - `server` - Server-side components
//! - `client` - Paying client and purchase service
//! - `telemetry` - `tracing` instrumentation

pub mod constants;
pub mod error;
pub mod headers;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod server;

pub use error::HttpError;
