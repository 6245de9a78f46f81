//! x402 payment-gated eSIM storefront server.
//!
//! Axum routes that sell eSIM data bundles for x402 payments, proxying the
//! catalogue and order flow of an upstream eSIM provider.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - API error responses
//! - [`config`] - Server configuration with environment variable expansion

pub mod config;
pub mod error;
pub mod handlers;

pub use handlers::{AppState, StoreState, store_router};
