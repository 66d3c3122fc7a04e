//! Dusk Bullion Core - Pricing and cart domain logic.
//!
//! This crate provides the pure domain computations shared by the storefront:
//! - [`pricing`] - Spot-linked, weight-aware unit price quotes
//! - [`money`] - USD/minor-unit conversion and the display/verified price split
//! - [`cart`] - The session cart aggregator (merge-on-add, quantity floors)
//! - [`checkout`] - Server-side order total recomputation and the identity gate
//!
//! # Architecture
//!
//! The core crate contains only types and computations - no I/O, no HTTP
//! clients, no storage. Everything here is deterministic: the checkout
//! boundary relies on re-running the same quote function the display path
//! used, against a freshly fetched spot price, to produce the only total that
//! is ever sent to the payment processor.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod money;
pub mod pricing;

pub use cart::{Cart, CartChange, CartLine};
pub use checkout::{
    CheckoutError, OrderLine, OrderTotals, PricedLine, PricedOrder, identity_required,
    recompute_order_total, shipping_usd,
};
pub use money::{DisplayPrice, VerifiedPrice, cents_to_usd, usd_to_cents};
pub use pricing::{GRAMS_PER_TROY_OUNCE, quote};
