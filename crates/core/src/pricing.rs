//! Spot-linked, weight-aware price quotes.
//!
//! A unit price is the live spot price scaled by the item's mass plus a flat
//! per-unit premium:
//!
//! ```text
//! unit = spot_usd_per_oz * (weight_grams / GRAMS_PER_TROY_OUNCE) + premium_usd
//! ```
//!
//! The quote function is pure. The display path and the checkout path call
//! the same function, so given the same spot price the checkout boundary
//! reproduces exactly the number the shopper saw.

use crate::money::VerifiedPrice;

/// Grams in one troy ounce. A physical-unit constant, not configuration.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.103_476_8;

/// Quote a unit price from a spot price, item weight, and flat premium.
///
/// Returns `None` when the spot price is absent, non-positive, or non-finite:
/// a missing spot price means "no quote available", never free merchandise.
///
/// Missing or non-positive weight defaults to one troy ounce; a missing
/// premium defaults to zero. The result is clamped at zero so adversarial
/// inputs (e.g., a large negative premium) cannot produce a negative price.
#[must_use]
pub fn quote(
    spot_usd_per_oz: f64,
    weight_grams: Option<f64>,
    premium_usd: Option<f64>,
) -> Option<VerifiedPrice> {
    if !spot_usd_per_oz.is_finite() || spot_usd_per_oz <= 0.0 {
        return None;
    }

    let grams = weight_grams
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(GRAMS_PER_TROY_OUNCE);
    let premium = premium_usd.filter(|p| p.is_finite()).unwrap_or(0.0);

    let unit = spot_usd_per_oz * (grams / GRAMS_PER_TROY_OUNCE) + premium;
    Some(VerifiedPrice::new(unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_ounce_is_spot_plus_premium() {
        let price = quote(2000.0, Some(GRAMS_PER_TROY_OUNCE), Some(150.0)).expect("quote");
        assert!((price.as_usd() - 2150.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_defaults_to_one_troy_ounce() {
        let defaulted = quote(2000.0, None, Some(150.0)).expect("quote");
        let explicit = quote(2000.0, Some(GRAMS_PER_TROY_OUNCE), Some(150.0)).expect("quote");
        assert!((defaulted.as_usd() - explicit.as_usd()).abs() < f64::EPSILON);
        // Non-positive weight is treated as missing, not as a zero-mass item.
        let zero_weight = quote(2000.0, Some(0.0), Some(150.0)).expect("quote");
        assert!((zero_weight.as_usd() - explicit.as_usd()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ten_gram_bar() {
        // 2000 * (10 / 31.1034768) + 150 = 793.0149...
        let price = quote(2000.0, Some(10.0), Some(150.0)).expect("quote");
        assert!((price.as_usd() - 793.014_931).abs() < 1e-3);
        assert_eq!(price.as_cents(), 79_301);
    }

    #[test]
    fn test_missing_spot_signals_absence_not_zero() {
        assert!(quote(0.0, Some(10.0), Some(150.0)).is_none());
        assert!(quote(-1.0, Some(10.0), Some(150.0)).is_none());
        assert!(quote(f64::NAN, Some(10.0), Some(150.0)).is_none());
    }

    #[test]
    fn test_negative_premium_cannot_go_below_zero() {
        let price = quote(100.0, Some(1.0), Some(-10_000.0)).expect("quote");
        assert!((price.as_usd() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_monotonic_in_spot() {
        let mut last = 0.0;
        for spot in [1.0, 10.0, 500.0, 2000.0, 2000.5, 5000.0] {
            let price = quote(spot, Some(10.0), Some(150.0)).expect("quote").as_usd();
            assert!(price >= last, "quote({spot}) regressed: {price} < {last}");
            last = price;
        }
    }

    #[test]
    fn test_deterministic() {
        let a = quote(1987.65, Some(31.1035), Some(120.0)).expect("quote");
        let b = quote(1987.65, Some(31.1035), Some(120.0)).expect("quote");
        assert!((a.as_usd() - b.as_usd()).abs() < f64::EPSILON);
    }
}
