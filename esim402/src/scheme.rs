//! Client-side payment handlers.
//!
//! A [`PaymentHandler`] turns a [`PaymentChallenge`] into a [`PaymentProof`],
//! typically by having a connected wallet authorize a token transfer. Paying
//! HTTP clients hold an ordered list of handlers and use the first one that
//! accepts a challenge.

use std::future::Future;
use std::pin::Pin;

use crate::proto::{PaymentChallenge, PaymentProof};

/// Boxed future returned by [`PaymentHandler::pay`].
pub type PayFuture<'a> = Pin<Box<dyn Future<Output = Result<PaymentProof, PaymentError>> + Send + 'a>>;

/// Produces payment proofs for challenges it understands.
pub trait PaymentHandler: Send + Sync {
    /// Short identifier used in logs (e.g. `"solana-usdc"`).
    fn name(&self) -> &str;

    /// Returns `true` once the handler can sign, i.e. its wallet is connected.
    fn is_ready(&self) -> bool;

    /// Returns `true` if this handler can satisfy the challenge's
    /// currency/recipient combination.
    fn accepts(&self, challenge: &PaymentChallenge) -> bool;

    /// Authorizes payment for `challenge`.
    fn pay<'a>(&'a self, challenge: &'a PaymentChallenge) -> PayFuture<'a>;
}

/// Errors a payment handler can report.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The wallet is not connected.
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// The challenge cannot be paid by this handler.
    #[error("Unsupported payment challenge: {0}")]
    UnsupportedChallenge(String),

    /// The wallet refused or failed to sign.
    #[error("Failed to sign payment: {0}")]
    SigningFailed(String),
}
