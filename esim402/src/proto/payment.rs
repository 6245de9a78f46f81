//! x402 challenge and proof types.
//!
//! A server that wants payment answers `402 Payment Required` with a
//! [`PaymentChallenge`]. The paying client turns the challenge into a
//! [`PaymentProof`] and retries the original request with the proof attached.
//! The server keeps no session between the two requests, so everything the
//! retry needs travels with the client.

use std::fmt;

use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};

/// Opaque correlation token issued with every challenge.
///
/// A base-36 millisecond timestamp followed by a random base-36 suffix.
/// Unique in practice, never used as a capability or for replay protection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let suffix: u64 = rng().random();
        let mut id = to_base36(millis);
        id.push_str(&to_base36(suffix));
        Self(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Context the client must echo back on its paid retry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMetadata {
    /// Bundle being bought.
    #[serde(default)]
    pub bundle_name: String,
    /// Number of bundles.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Correlation token for this challenge.
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

const fn default_quantity() -> u32 {
    1
}

/// Machine-readable payment terms carried by a 402 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    /// Amount due, in minor units of `currency`.
    pub amount: u64,
    /// ISO currency code.
    pub currency: String,
    /// What the payment buys.
    #[serde(default)]
    pub description: String,
    /// Address that must receive the payment.
    pub recipient: String,
    /// Purchase context and correlation id.
    #[serde(default)]
    pub metadata: ChallengeMetadata,
}

/// Unsigned payment authorization, the message a wallet signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Cluster the transfer targets (e.g. `"devnet"`).
    pub network: String,
    /// Paying wallet address.
    pub payer: String,
    /// Receiving address, copied from the challenge.
    pub recipient: String,
    /// Token mint the payment is denominated in.
    pub mint: String,
    /// Amount in token base units.
    pub amount: u64,
    /// Challenge correlation id, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}

impl PaymentIntent {
    /// Canonical bytes signed by the payer.
    #[must_use]
    pub fn message(&self) -> Vec<u8> {
        format!(
            "x402-esim:v1|{}|{}|{}|{}|{}|{}",
            self.network,
            self.payer,
            self.recipient,
            self.mint,
            self.amount,
            self.order_id.as_ref().map_or("", OrderId::as_str),
        )
        .into_bytes()
    }

    /// Attaches a signature, producing the proof sent to the server.
    #[must_use]
    pub fn into_proof(self, signature: String) -> PaymentProof {
        PaymentProof {
            intent: self,
            signature,
        }
    }
}

/// Signed payment artifact attached to the paid retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    /// What was authorized.
    #[serde(flatten)]
    pub intent: PaymentIntent,
    /// Wallet signature over [`PaymentIntent::message`], base58.
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_ids_are_distinct() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_challenge_wire_shape() {
        let challenge = PaymentChallenge {
            amount: 600,
            currency: "USD".to_owned(),
            description: "eSIM, 1GB - 1x".to_owned(),
            recipient: "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_owned(),
            metadata: ChallengeMetadata {
                bundle_name: "esim_1GB".to_owned(),
                quantity: 1,
                order_id: Some(OrderId::from("abc".to_owned())),
            },
        };
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["metadata"]["bundleName"], "esim_1GB");
        assert_eq!(json["metadata"]["orderId"], "abc");
        assert_eq!(json["amount"], 600);
    }

    #[test]
    fn test_intent_message_binds_every_field() {
        let intent = PaymentIntent {
            network: "devnet".to_owned(),
            payer: "payer".to_owned(),
            recipient: "shop".to_owned(),
            mint: "mint".to_owned(),
            amount: 6_000_000,
            order_id: None,
        };
        let base = intent.message();
        let mut other = intent.clone();
        other.amount += 1;
        assert_ne!(base, other.message());
        assert_eq!(
            String::from_utf8(base).unwrap(),
            "x402-esim:v1|devnet|payer|shop|mint|6000000|"
        );
    }
}
