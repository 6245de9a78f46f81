//! USDC-on-Solana [`PaymentHandler`].

use std::sync::Arc;

use esim402::networks::SolanaNetwork;
use esim402::pricing::cents_to_usdc_base_units;
use esim402::proto::{PaymentChallenge, PaymentIntent};
use esim402::scheme::{PayFuture, PaymentError, PaymentHandler};
use solana_pubkey::Pubkey;
use tokio::sync::Mutex;

use crate::networks::usdc_mint;
use crate::wallet::{WalletAdapter, WalletError};

/// Currencies a USD-denominated challenge may be quoted in.
const ACCEPTED_CURRENCIES: &[&str] = &["USD", "USDC"];

/// Pays USD challenges with USDC from a connected Solana wallet.
///
/// Only one signing request is in flight per handler at any time; wallets
/// that prompt the user cannot cope with overlapping requests.
#[derive(Debug)]
pub struct SolanaUsdcHandler<W> {
    wallet: Arc<W>,
    network: SolanaNetwork,
    mint: Pubkey,
    signing: Mutex<()>,
}

impl<W: WalletAdapter> SolanaUsdcHandler<W> {
    /// Creates a handler settling in the USDC mint of `network`.
    pub fn new(wallet: Arc<W>, network: SolanaNetwork) -> Self {
        Self {
            wallet,
            network,
            mint: usdc_mint(network),
            signing: Mutex::new(()),
        }
    }

    /// Overrides the token mint, e.g. for a local test validator.
    #[must_use]
    pub const fn with_mint(mut self, mint: Pubkey) -> Self {
        self.mint = mint;
        self
    }

    /// Cluster this handler pays on.
    #[must_use]
    pub const fn network(&self) -> SolanaNetwork {
        self.network
    }

    /// Token mint payments are denominated in.
    #[must_use]
    pub const fn mint(&self) -> &Pubkey {
        &self.mint
    }

    fn intent_for(&self, payer: Pubkey, challenge: &PaymentChallenge) -> PaymentIntent {
        PaymentIntent {
            network: self.network.name().to_owned(),
            payer: payer.to_string(),
            recipient: challenge.recipient.clone(),
            mint: self.mint.to_string(),
            amount: cents_to_usdc_base_units(challenge.amount),
            order_id: challenge.metadata.order_id.clone(),
        }
    }
}

impl<W: WalletAdapter> PaymentHandler for SolanaUsdcHandler<W> {
    fn name(&self) -> &'static str {
        "solana-usdc"
    }

    fn is_ready(&self) -> bool {
        self.wallet.is_connected()
    }

    fn accepts(&self, challenge: &PaymentChallenge) -> bool {
        ACCEPTED_CURRENCIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&challenge.currency))
            && challenge.recipient.parse::<Pubkey>().is_ok()
    }

    fn pay<'a>(&'a self, challenge: &'a PaymentChallenge) -> PayFuture<'a> {
        Box::pin(async move {
            if !self.accepts(challenge) {
                return Err(PaymentError::UnsupportedChallenge(format!(
                    "{} to {}",
                    challenge.currency, challenge.recipient
                )));
            }
            let _guard = self.signing.lock().await;
            let payer = match self.wallet.pubkey() {
                Some(payer) if self.wallet.is_connected() => payer,
                _ => return Err(PaymentError::WalletNotConnected),
            };
            let intent = self.intent_for(payer, challenge);
            let signature = self
                .wallet
                .sign_message(&intent.message())
                .await
                .map_err(|e| match e {
                    WalletError::NotConnected => PaymentError::WalletNotConnected,
                    WalletError::Signing(msg) => PaymentError::SigningFailed(msg),
                })?;

            #[cfg(feature = "telemetry")]
            tracing::debug!(payer = %payer, amount = intent.amount, "Signed USDC payment intent");

            Ok(intent.into_proof(signature.to_string()))
        })
    }
}
