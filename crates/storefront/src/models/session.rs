//! Session keys.
//!
//! The cart is stored in the session as serialized `dusk_bullion_core::Cart`
//! lines; it is written back after every mutation and restored on each
//! request, which is what makes the cart survive reloads until it is
//! explicitly cleared.

/// Session keys for storefront data.
pub mod keys {
    /// Key for the serialized cart lines.
    pub const CART: &str = "dusb-cart";
}
