//! Solana clusters the storefront can settle on.
//!
//! Chain identifiers follow CAIP-2 (`solana:<genesis-hash-prefix>`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target Solana cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaNetwork {
    /// Public devnet.
    #[default]
    Devnet,
    /// Mainnet beta.
    #[serde(alias = "mainnet", alias = "solana")]
    MainnetBeta,
}

impl SolanaNetwork {
    /// Cluster name as used by wallets and RPC providers.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::MainnetBeta => "mainnet-beta",
        }
    }

    /// CAIP-2 chain identifier.
    #[must_use]
    pub const fn caip2(&self) -> &'static str {
        match self {
            Self::Devnet => "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            Self::MainnetBeta => "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        }
    }
}

impl fmt::Display for SolanaNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a cluster name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown Solana network '{0}', expected 'devnet' or 'mainnet-beta'")]
pub struct UnknownNetwork(pub String);

impl FromStr for SolanaNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" | "solana-devnet" => Ok(Self::Devnet),
            "mainnet" | "mainnet-beta" | "solana" => Ok(Self::MainnetBeta),
            _ => Err(UnknownNetwork(s.to_owned())),
        }
    }
}
