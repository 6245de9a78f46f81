//! USDC mint addresses per Solana cluster.

use esim402::networks::SolanaNetwork;
use solana_pubkey::{Pubkey, pubkey};

/// Native Circle USDC on mainnet beta.
pub const USDC_MAINNET: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDC mint the storefront's devnet deployment settles in.
pub const USDC_DEVNET: Pubkey = pubkey!("Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr");

/// Decimal places of every USDC mint.
pub const USDC_DECIMALS: u8 = 6;

/// Returns the USDC mint for `network`.
#[must_use]
pub const fn usdc_mint(network: SolanaNetwork) -> Pubkey {
    match network {
        SolanaNetwork::Devnet => USDC_DEVNET,
        SolanaNetwork::MainnetBeta => USDC_MAINNET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_per_network() {
        assert_eq!(
            usdc_mint(SolanaNetwork::MainnetBeta).to_string(),
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        );
        assert_eq!(
            usdc_mint(SolanaNetwork::Devnet).to_string(),
            "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr"
        );
    }
}
