//! USD amounts and the display/verified trust split.
//!
//! Two price types flow through the system:
//!
//! - [`DisplayPrice`] is a client-visible snapshot taken when an item was
//!   added to the cart. It drives the cart badge and subtotal estimate and is
//!   never trusted at checkout.
//! - [`VerifiedPrice`] is produced server-side by the quote function against a
//!   freshly fetched spot price. It is the only type the payment client
//!   accepts for charge amounts, and it cannot be deserialized from client
//!   input.
//!
//! The payment processor takes integral minor units (cents), derived by
//! rounding half away from zero at the cent and never emitting a negative
//! amount.

use serde::{Deserialize, Serialize};

/// Convert a USD amount to integral cents.
///
/// Rounds half away from zero at the cent and floors at zero; non-finite
/// input maps to zero rather than propagating into a charge amount.
#[must_use]
pub fn usd_to_cents(usd: f64) -> u64 {
    if !usd.is_finite() {
        return 0;
    }
    // f64::round rounds half away from zero, which is the required policy.
    let cents = (usd * 100.0).round();
    if cents.is_sign_negative() {
        0
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            cents as u64
        }
    }
}

/// Convert integral cents back to a USD amount.
#[must_use]
pub fn cents_to_usd(cents: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        cents as f64 / 100.0
    }
}

/// Format a USD amount for display (e.g., "$19.99").
#[must_use]
pub fn format_usd(usd: f64) -> String {
    format!("${usd:.2}")
}

/// A client-visible unit price snapshot.
///
/// Used only for display subtotals; the checkout boundary recomputes prices
/// from scratch and ignores this value entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DisplayPrice(f64);

impl DisplayPrice {
    /// Create a display snapshot from a USD amount.
    #[must_use]
    pub const fn from_usd(usd: f64) -> Self {
        Self(usd)
    }

    /// The snapshotted USD amount.
    #[must_use]
    pub const fn as_usd(self) -> f64 {
        self.0
    }
}

impl From<VerifiedPrice> for DisplayPrice {
    fn from(price: VerifiedPrice) -> Self {
        Self(price.as_usd())
    }
}

/// A server-derived USD amount, safe to charge.
///
/// Only the quote and order-recomputation paths can construct this type, and
/// it deliberately does not implement `Deserialize`: a client-supplied number
/// can never masquerade as a verified one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VerifiedPrice(f64);

impl VerifiedPrice {
    /// Construct from a non-negative USD amount.
    ///
    /// Crate-private: only the pricing and checkout modules mint verified
    /// prices.
    pub(crate) fn new(usd: f64) -> Self {
        Self(usd.max(0.0))
    }

    /// The verified USD amount.
    #[must_use]
    pub const fn as_usd(self) -> f64 {
        self.0
    }

    /// The amount in integral cents, as the payment boundary requires.
    #[must_use]
    pub fn as_cents(self) -> u64 {
        usd_to_cents(self.0)
    }
}
