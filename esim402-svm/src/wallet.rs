//! Wallet abstraction used by the USDC payment handler.
//!
//! Browser wallets, hardware wallets and in-process keypairs all reduce to
//! the same three capabilities here: report whether they are connected,
//! expose the active public key, and sign an arbitrary message.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;

/// Boxed future returned by [`WalletAdapter::sign_message`].
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<Signature, WalletError>> + Send + 'a>>;

/// Errors a wallet can report.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No account is connected.
    #[error("wallet not connected")]
    NotConnected,
    /// The wallet rejected or failed the signing request.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// A Solana wallet able to sign messages.
pub trait WalletAdapter: Send + Sync {
    /// Returns `true` while an account is connected.
    fn is_connected(&self) -> bool;

    /// Public key of the connected account.
    fn pubkey(&self) -> Option<Pubkey>;

    /// Signs `message` with the connected account.
    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a>;
}

/// [`WalletAdapter`] backed by an in-process [`Signer`] such as a keypair.
///
/// Starts disconnected, mirroring a browser wallet that has not yet been
/// approved by the user.
#[derive(Debug)]
pub struct KeypairWallet<S> {
    signer: S,
    connected: AtomicBool,
}

impl<S: Signer> KeypairWallet<S> {
    /// Wraps `signer` in a disconnected wallet.
    pub const fn new(signer: S) -> Self {
        Self {
            signer,
            connected: AtomicBool::new(false),
        }
    }

    /// Marks the wallet connected.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Marks the wallet disconnected.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl<S: Signer + Send + Sync> WalletAdapter for KeypairWallet<S> {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn pubkey(&self) -> Option<Pubkey> {
        self.is_connected()
            .then(|| Pubkey::new_from_array(self.signer.pubkey().to_bytes()))
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(WalletError::NotConnected);
            }
            self.signer
                .try_sign_message(message)
                .map_err(|e| WalletError::Signing(e.to_string()))
        })
    }
}
