#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana support for the x402 eSIM storefront.
//!
//! Paying clients hand a [`SolanaUsdcHandler`] to the x402 request client.
//! When the storefront answers a purchase with `402 Payment Required`, the
//! handler converts the USD charge into USDC base units and has the
//! connected wallet sign a transfer intent addressed to the challenge's
//! recipient.
//!
//! # Modules
//!
//! - [`networks`] - USDC mint per Solana cluster
//! - [`wallet`] - Wallet abstraction and a local keypair implementation
//! - [`handler`] - The USDC [`PaymentHandler`](esim402::scheme::PaymentHandler)
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing of signing operations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use esim402::networks::SolanaNetwork;
//! use esim402_svm::{KeypairWallet, SolanaUsdcHandler};
//! use solana_keypair::Keypair;
//!
//! let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
//! wallet.connect();
//! let handler = SolanaUsdcHandler::new(wallet, SolanaNetwork::Devnet);
//! ```

pub mod handler;
pub mod networks;
pub mod wallet;

pub use handler::SolanaUsdcHandler;
pub use networks::usdc_mint;
pub use wallet::{KeypairWallet, WalletAdapter, WalletError};
