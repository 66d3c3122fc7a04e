//! The cart aggregator: a keyed mapping from product to line entry.
//!
//! Lines are keyed uniquely by product id. Adding a product already in the
//! cart merges by incrementing quantity (and refreshes the display-price
//! snapshot so a later price refresh updates what is shown), never by
//! inserting a duplicate line. A quantity edit that would drive a line to
//! zero or below removes the line entirely; a non-positive quantity never
//! persists.
//!
//! All operations are total: mutating local cart state has no error path.
//! Errors only arise later, at the network boundary, when the cart's
//! contents are submitted for checkout.
//!
//! Every mutation returns a [`CartChange`] describing what happened, which is
//! the change-notification seam: callers persist the cart and propagate the
//! event without the container knowing anything about storage or rendering.

use serde::{Deserialize, Serialize};

use crate::money::DisplayPrice;

/// One product entry in the cart.
///
/// `weight_grams` and `premium_usd` are carried alongside the line so the
/// checkout boundary can recompute an authoritative price without trusting
/// `display_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Unique key within the cart.
    pub product_id: String,
    /// Product name, denormalized for payment line-item descriptions.
    pub name: String,
    /// Product image URL, denormalized for payment line-item descriptions.
    pub image: String,
    /// Unit price snapshot at add (or last merge) time. Display only.
    pub display_price: DisplayPrice,
    /// Always >= 1; a zero-quantity line is removed, not stored.
    pub quantity: u32,
    /// Mass of one unit in grams; `None` means one troy ounce.
    pub weight_grams: Option<f64>,
    /// Flat per-unit premium in USD; `None` means zero.
    pub premium_usd: Option<f64>,
}

/// What a cart mutation did, for logging and persistence decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was inserted or an existing line merged; carries the
    /// resulting quantity.
    Added { product_id: String, quantity: u32 },
    /// A line's quantity was overwritten.
    Updated { product_id: String, quantity: u32 },
    /// A line was removed.
    Removed { product_id: String },
    /// All lines were removed.
    Cleared,
    /// Nothing changed (e.g., removing an absent line).
    Noop,
}

impl CartChange {
    /// Whether the mutation altered cart state (and so needs persisting).
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Noop)
    }
}

/// In-memory cart state, serialized to a durable slot on every mutation by
/// the owning session.
///
/// Lines keep insertion order for stable display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a line, merging into an existing line for the same product.
    ///
    /// A merge increments the existing quantity by the line's quantity and
    /// overwrites the display-price snapshot with the newly supplied one.
    /// A line quantity of zero is coerced to one.
    pub fn add(&mut self, line: CartLine) -> CartChange {
        let added_quantity = line.quantity.max(1);

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(added_quantity);
            existing.display_price = line.display_price;
            return CartChange::Added {
                product_id: existing.product_id.clone(),
                quantity: existing.quantity,
            };
        }

        let product_id = line.product_id.clone();
        self.lines.push(CartLine {
            quantity: added_quantity,
            ..line
        });
        CartChange::Added {
            product_id,
            quantity: added_quantity,
        }
    }

    /// Overwrite a line's quantity.
    ///
    /// A quantity of zero or below removes the line (removal, not a
    /// zero-quantity line, is the terminal state). Absent lines are a no-op.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CartChange {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX).max(1);

        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
        {
            Some(line) => {
                line.quantity = quantity;
                CartChange::Updated {
                    product_id: product_id.to_string(),
                    quantity,
                }
            }
            None => CartChange::Noop,
        }
    }

    /// Remove a line. A no-op (not an error) when the product is absent.
    pub fn remove(&mut self, product_id: &str) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            CartChange::Noop
        } else {
            CartChange::Removed {
                product_id: product_id.to_string(),
            }
        }
    }

    /// Empty the cart entirely (used after a completed checkout).
    pub fn clear(&mut self) -> CartChange {
        if self.lines.is_empty() {
            return CartChange::Noop;
        }
        self.lines.clear();
        CartChange::Cleared
    }

    /// Total unit count across all lines (the navigation badge number).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |n, l| n.saturating_add(l.quantity))
    }

    /// Display subtotal: sum of snapshot price times quantity.
    ///
    /// A UI-only estimate; the authoritative total is recomputed server-side
    /// at checkout.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.display_price.as_usd() * f64::from(l.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, price: f64, quantity: u32) -> CartLine {
        CartLine {
            product_id: id.to_string(),
            name: format!("Product {id}"),
            image: String::new(),
            display_price: DisplayPrice::from_usd(price),
            quantity,
            weight_grams: Some(31.1035),
            premium_usd: Some(150.0),
        }
    }

    #[test]
    fn test_add_merges_by_product_id() {
        let mut cart = Cart::new();
        cart.add(line("au-bar-1oz", 2150.0, 1));
        let change = cart.add(line("au-bar-1oz", 2150.0, 2));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 3);
        assert_eq!(
            change,
            CartChange::Added {
                product_id: "au-bar-1oz".to_string(),
                quantity: 3,
            }
        );
    }

    #[test]
    fn test_merge_refreshes_price_snapshot() {
        let mut cart = Cart::new();
        cart.add(line("au-bar-1oz", 2150.0, 1));
        cart.add(line("au-bar-1oz", 2175.5, 1));

        let current = &cart.lines()[0];
        assert!((current.display_price.as_usd() - 2175.5).abs() < f64::EPSILON);
        assert_eq!(current.quantity, 2);
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        for bad in [0, -1] {
            let mut cart = Cart::new();
            cart.add(line("au-bar-1oz", 2150.0, 2));
            let change = cart.set_quantity("au-bar-1oz", bad);
            assert!(cart.is_empty(), "set_quantity({bad}) left the line behind");
            assert_eq!(
                change,
                CartChange::Removed {
                    product_id: "au-bar-1oz".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut cart = Cart::new();
        cart.add(line("au-bar-1oz", 2150.0, 1));
        cart.set_quantity("au-bar-1oz", 5);
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_set_quantity_absent_is_noop() {
        let mut cart = Cart::new();
        assert_eq!(cart.set_quantity("missing", 3), CartChange::Noop);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(line("au-bar-1oz", 2150.0, 1));
        assert_eq!(cart.remove("missing"), CartChange::Noop);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add(line("a", 100.0, 1));
        cart.add(line("b", 200.0, 2));
        assert_eq!(cart.clear(), CartChange::Cleared);
        assert!(cart.is_empty());
        assert_eq!(cart.clear(), CartChange::Noop);
    }

    #[test]
    fn test_count_and_subtotal() {
        let mut cart = Cart::new();
        cart.add(line("a", 100.0, 2));
        cart.add(line("b", 250.5, 1));
        assert_eq!(cart.count(), 3);
        assert!((cart.subtotal() - 450.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quantity_add_coerced_to_one() {
        let mut cart = Cart::new();
        cart.add(line("a", 100.0, 0));
        assert_eq!(cart.count(), 1);
    }
}
