//! Payer-facing pricing for catalogue bundles.
//!
//! The provider lists bundle prices as USD major units (a JSON number such as
//! `4.99`). The x402 purchase path charges that price plus a fixed markup,
//! expressed as an integer number of minor units (cents). All arithmetic is
//! done in [`Decimal`] so that prices like `19.99` never pick up binary
//! floating-point drift before rounding.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::proto::Bundle;

/// Markup applied to the provider price on the x402 purchase path (20%).
pub const MARKUP_MULTIPLIER: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// Currency code of every quote produced here.
pub const QUOTE_CURRENCY: &str = "USD";

/// Minor units per major unit of [`QUOTE_CURRENCY`].
const MINOR_UNITS_PER_MAJOR: Decimal = Decimal::ONE_HUNDRED;

/// USDC base units (6 decimals) per US cent.
pub const USDC_BASE_UNITS_PER_CENT: u64 = 10_000;

/// Errors produced while computing a quote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// Quantity or price is outside the accepted domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Payer-facing price for `quantity` units of a bundle.
///
/// Ephemeral: computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingQuote {
    /// Catalogue name of the priced bundle.
    pub bundle_name: String,
    /// Number of bundles being bought.
    pub quantity: u32,
    /// Provider price of a single bundle, in minor units.
    pub base_price_minor_units: u64,
    /// Markup applied to the provider price.
    pub markup_multiplier: Decimal,
    /// Total amount the payer is charged, in minor units.
    pub charge_minor_units: u64,
    /// ISO currency code of both amounts.
    pub currency: String,
}

/// Quotes `quantity` units of `bundle`.
///
/// # Errors
///
/// Returns [`PricingError::InvalidInput`] if `quantity` is zero or the bundle
/// price is negative or not finite.
pub fn quote(bundle: &Bundle, quantity: u32) -> Result<PricingQuote, PricingError> {
    quote_price(&bundle.name, bundle.price, quantity)
}

/// Quotes `quantity` units of a bundle priced at `price` USD.
///
/// `charge = round_half_up(price * 100 * quantity * MARKUP_MULTIPLIER)`.
///
/// # Errors
///
/// Returns [`PricingError::InvalidInput`] if `quantity` is zero or `price` is
/// negative or not finite.
pub fn quote_price(
    bundle_name: &str,
    price: f64,
    quantity: u32,
) -> Result<PricingQuote, PricingError> {
    if quantity < 1 {
        return Err(PricingError::InvalidInput(
            "quantity must be at least 1".to_owned(),
        ));
    }
    let price = Decimal::from_f64(price)
        .ok_or_else(|| PricingError::InvalidInput(format!("price {price} is not a number")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(PricingError::InvalidInput(format!(
            "price {price} is negative"
        )));
    }

    let base_minor = price * MINOR_UNITS_PER_MAJOR;
    let charge = base_minor * Decimal::from(quantity) * MARKUP_MULTIPLIER;

    Ok(PricingQuote {
        bundle_name: bundle_name.to_owned(),
        quantity,
        base_price_minor_units: to_minor_units(base_minor)?,
        markup_multiplier: MARKUP_MULTIPLIER,
        charge_minor_units: to_minor_units(charge)?,
        currency: QUOTE_CURRENCY.to_owned(),
    })
}

/// Converts US cents into USDC base units.
#[must_use]
pub const fn cents_to_usdc_base_units(cents: u64) -> u64 {
    cents.saturating_mul(USDC_BASE_UNITS_PER_CENT)
}

fn to_minor_units(amount: Decimal) -> Result<u64, PricingError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| PricingError::InvalidInput(format!("amount {amount} is out of range")))
}
