//! Server-side order recomputation.
//!
//! A client could fabricate its display prices, so the boundary that creates
//! a payable transaction never trusts them. It re-runs the quote function
//! against a freshly fetched spot price using each line's own weight and
//! premium, sums an authoritative subtotal, applies the shipping policy, and
//! only that total ever reaches the payment processor.
//!
//! Shipping policy: free (insured) above $500, else a flat $15. Policy
//! constants, not user input.

use serde::Deserialize;
use thiserror::Error;

use crate::cart::CartLine;
use crate::money::VerifiedPrice;
use crate::pricing::quote;

/// Orders strictly above this subtotal ship free.
pub const FREE_SHIPPING_OVER_USD: f64 = 500.0;

/// Flat insured-shipping rate below the free threshold.
pub const FLAT_SHIPPING_USD: f64 = 15.0;

/// Errors the order recomputation can produce.
///
/// Validation failures (empty cart) are raised before any external call;
/// `SpotUnavailable` means checkout cannot proceed without a trusted live
/// price.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Checkout attempted with zero line items.
    #[error("cart is empty")]
    EmptyCart,

    /// The price feed returned no usable price.
    #[error("spot price unavailable")]
    SpotUnavailable,
}

/// The pricing inputs for one order line.
///
/// Deliberately excludes any client-supplied price: only weight, premium,
/// and quantity cross the trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OrderLine {
    /// Mass of one unit in grams; `None` means one troy ounce.
    pub weight_grams: Option<f64>,
    /// Flat per-unit premium in USD; `None` means zero.
    pub premium_usd: Option<f64>,
    /// Units ordered; zero is coerced to one.
    pub quantity: u32,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            weight_grams: line.weight_grams,
            premium_usd: line.premium_usd,
            quantity: line.quantity,
        }
    }
}

/// One order line with its server-verified unit price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    /// Authoritative per-unit price at the fresh spot.
    pub unit_price: VerifiedPrice,
    /// Units ordered (already floored at one).
    pub quantity: u32,
}

/// The authoritative order amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: VerifiedPrice,
    pub shipping: VerifiedPrice,
    pub total: VerifiedPrice,
}

/// A fully repriced order: per-line verified prices plus totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub totals: OrderTotals,
}

/// The shipping charge for a given subtotal.
#[must_use]
pub fn shipping_usd(subtotal_usd: f64) -> f64 {
    if subtotal_usd > FREE_SHIPPING_OVER_USD {
        0.0
    } else {
        FLAT_SHIPPING_USD
    }
}

/// Recompute the authoritative order total from a fresh spot price.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`] when `lines` is empty (checked before
///   anything else, so callers can reject before touching the network).
/// - [`CheckoutError::SpotUnavailable`] when the spot price is non-positive
///   or non-finite.
pub fn recompute_order_total(
    spot_usd_per_oz: f64,
    lines: &[OrderLine],
) -> Result<PricedOrder, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if !spot_usd_per_oz.is_finite() || spot_usd_per_oz <= 0.0 {
        return Err(CheckoutError::SpotUnavailable);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = 0.0_f64;
    for line in lines {
        let unit_price = quote(spot_usd_per_oz, line.weight_grams, line.premium_usd)
            .ok_or(CheckoutError::SpotUnavailable)?;
        let quantity = line.quantity.max(1);
        subtotal += unit_price.as_usd() * f64::from(quantity);
        priced.push(PricedLine {
            unit_price,
            quantity,
        });
    }

    let shipping = shipping_usd(subtotal);
    Ok(PricedOrder {
        lines: priced,
        totals: OrderTotals {
            subtotal: VerifiedPrice::new(subtotal),
            shipping: VerifiedPrice::new(shipping),
            total: VerifiedPrice::new(subtotal + shipping),
        },
    })
}

/// Whether a high-value order must complete identity verification before a
/// payable transaction may be created.
///
/// The gate applies only when a threshold is configured (a threshold of zero
/// or below disables it), the subtotal meets or exceeds it, and the buyer has
/// not already verified.
#[must_use]
pub fn identity_required(
    subtotal_usd: f64,
    threshold_usd: Option<f64>,
    buyer_verified: bool,
) -> bool {
    match threshold_usd {
        Some(threshold) if threshold > 0.0 => subtotal_usd >= threshold && !buyer_verified,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::DisplayPrice;
    use crate::pricing::GRAMS_PER_TROY_OUNCE;

    fn one_oz_line(quantity: u32) -> OrderLine {
        OrderLine {
            weight_grams: Some(31.1035),
            premium_usd: Some(150.0),
            quantity,
        }
    }

    #[test]
    fn test_empty_cart_rejected_first() {
        // Even with an unusable spot, the empty cart wins: it is validated
        // before the spot price would matter.
        assert_eq!(
            recompute_order_total(0.0, &[]),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_bad_spot_is_unavailable() {
        for spot in [0.0, -10.0, f64::NAN] {
            assert_eq!(
                recompute_order_total(spot, &[one_oz_line(1)]),
                Err(CheckoutError::SpotUnavailable)
            );
        }
    }

    #[test]
    fn test_recompute_ignores_client_price() {
        // A fabricated $1.00 display snapshot on a real 1 oz / $150-premium
        // line must reprice to ~$2150 at $2000/oz.
        let fabricated = CartLine {
            product_id: "au-bar-1oz".to_string(),
            name: "1oz Bar".to_string(),
            image: String::new(),
            display_price: DisplayPrice::from_usd(1.0),
            quantity: 1,
            weight_grams: Some(31.1035),
            premium_usd: Some(150.0),
        };
        let order_line = OrderLine::from(&fabricated);
        let priced = recompute_order_total(2000.0, &[order_line]).expect("priced");

        let expected = 2000.0 * (31.1035 / GRAMS_PER_TROY_OUNCE) + 150.0;
        assert!((priced.lines[0].unit_price.as_usd() - expected).abs() < 1e-9);
        assert!((expected - 2150.0).abs() < 0.01);
    }

    #[test]
    fn test_shipping_threshold_boundary() {
        // Exactly $500.00 still pays flat shipping; a cent over ships free.
        assert!((shipping_usd(500.0) - FLAT_SHIPPING_USD).abs() < f64::EPSILON);
        assert!((shipping_usd(500.01) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ten_gram_end_to_end() {
        // One 10 g bar at $150 premium, spot $2000/oz, quantity 2:
        // unit = 2000 * (10 / 31.1034768) + 150 = 793.0149...
        // subtotal = 1586.03, over $500 so shipping is free.
        let line = OrderLine {
            weight_grams: Some(10.0),
            premium_usd: Some(150.0),
            quantity: 2,
        };
        let priced = recompute_order_total(2000.0, &[line]).expect("priced");

        assert!((priced.lines[0].unit_price.as_usd() - 793.014_931).abs() < 1e-3);
        assert!((priced.totals.subtotal.as_usd() - 1586.029_863).abs() < 1e-3);
        assert!((priced.totals.shipping.as_usd() - 0.0).abs() < f64::EPSILON);
        assert!(
            (priced.totals.total.as_usd() - priced.totals.subtotal.as_usd()).abs() < f64::EPSILON
        );
        assert_eq!(priced.totals.total.as_cents(), 158_603);
    }

    #[test]
    fn test_small_order_pays_flat_shipping() {
        // 1 g at zero premium stays well under the threshold.
        let line = OrderLine {
            weight_grams: Some(1.0),
            premium_usd: None,
            quantity: 1,
        };
        let priced = recompute_order_total(2000.0, &[line]).expect("priced");
        assert!((priced.totals.shipping.as_usd() - FLAT_SHIPPING_USD).abs() < f64::EPSILON);
        assert!(
            (priced.totals.total.as_usd()
                - (priced.totals.subtotal.as_usd() + FLAT_SHIPPING_USD))
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_zero_quantity_coerced_to_one() {
        let line = OrderLine {
            weight_grams: Some(10.0),
            premium_usd: Some(150.0),
            quantity: 0,
        };
        let priced = recompute_order_total(2000.0, &[line]).expect("priced");
        assert_eq!(priced.lines[0].quantity, 1);
    }

    #[test]
    fn test_identity_gate() {
        // Gate disabled when no threshold is configured.
        assert!(!identity_required(10_000.0, None, false));
        assert!(!identity_required(10_000.0, Some(0.0), false));
        // At or above the threshold, unverified buyers are gated.
        assert!(identity_required(1000.0, Some(1000.0), false));
        assert!(identity_required(1500.0, Some(1000.0), false));
        // Verified buyers and below-threshold orders pass.
        assert!(!identity_required(1500.0, Some(1000.0), true));
        assert!(!identity_required(999.99, Some(1000.0), false));
    }
}
