//! Cart route handlers.
//!
//! The cart is a `dusk_bullion_core::Cart` serialized into the session: it
//! is restored at the start of each request and written back after every
//! mutation, which gives it survive-reload semantics independent of any
//! storage backend. The unit price snapshotted on add comes from the live
//! spot quote; checkout recomputes prices and ignores these snapshots.

use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use dusk_bullion_core::{Cart, CartLine, money, quote};

use crate::catalog;
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;

/// Cart item display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price_usd: f64,
    pub line_price_usd: f64,
    pub price: String,
    pub line_price: String,
    pub weight_grams: Option<f64>,
    pub premium_usd: Option<f64>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    /// Display estimate only; checkout recomputes the authoritative total.
    pub subtotal_usd: f64,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal_usd: cart.subtotal(),
            subtotal: money::format_usd(cart.subtotal()),
            item_count: cart.count(),
        }
    }
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        let unit = line.display_price.as_usd();
        let line_total = unit * f64::from(line.quantity);
        Self {
            id: line.product_id.clone(),
            name: line.name.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            unit_price_usd: unit,
            line_price_usd: line_total,
            price: money::format_usd(unit),
            line_price: money::format_usd(line_total),
            weight_grams: line.weight_grams,
            premium_usd: line.premium_usd,
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCountView {
    pub count: u32,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Restore the cart from its session slot, empty if absent.
async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the cart to its session slot.
async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Add to cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    /// Units to add; missing, fractional, or invalid input defaults sanely.
    pub quantity: Option<f64>,
}

/// Update quantity request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub product_id: String,
    pub quantity: f64,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub product_id: String,
}

/// Coerce a raw "units to add" value to a positive integer. Invalid input
/// defaults to 1, not an error.
fn coerce_added_quantity(raw: Option<f64>) -> u32 {
    match raw {
        Some(q) if q.is_finite() && q >= 1.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                q.trunc().min(f64::from(u32::MAX)) as u32
            }
        }
        _ => 1,
    }
}

/// Coerce a raw quantity edit to an integer. Non-positive values signal
/// removal; fractional positives floor at 1; invalid input defaults to 1.
fn coerce_set_quantity(raw: f64) -> i64 {
    if !raw.is_finite() {
        return 1;
    }
    if raw <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    {
        (raw.trunc() as i64).max(1)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let cart = load_cart(&session).await;
    Json(CartView::from(&cart))
}

/// Add an item to the cart, merging into an existing line.
///
/// Snapshots the current live quote as the line's display price; a later add
/// of the same product refreshes the snapshot.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let product = catalog::get_product_by_id(&request.product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", request.product_id)))?;

    let spot = state.spot().latest().await?;
    let display_price = quote(
        spot.usd_per_oz,
        Some(product.weight_grams),
        Some(product.premium_usd),
    )
    .ok_or_else(|| AppError::Internal("quote failed for a usable spot price".to_string()))?;

    let mut cart = load_cart(&session).await;
    let change = cart.add(CartLine {
        product_id: product.id.to_string(),
        name: product.name.to_string(),
        image: product.image.to_string(),
        display_price: display_price.into(),
        quantity: coerce_added_quantity(request.quantity),
        weight_grams: Some(product.weight_grams),
        premium_usd: Some(product.premium_usd),
    });
    save_cart(&session, &cart).await?;
    tracing::debug!(?change, "Cart add");

    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity; zero or below removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    let change = cart.set_quantity(&request.product_id, coerce_set_quantity(request.quantity));
    if change.is_mutation() {
        save_cart(&session, &cart).await?;
    }
    tracing::debug!(?change, "Cart update");

    Ok(Json(CartView::from(&cart)))
}

/// Remove a line; a no-op when the product is absent.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    let change = cart.remove(&request.product_id);
    if change.is_mutation() {
        save_cart(&session, &cart).await?;
    }
    tracing::debug!(?change, "Cart remove");

    Ok(Json(CartView::from(&cart)))
}

/// Empty the cart (used after a completed checkout).
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    let change = cart.clear();
    if change.is_mutation() {
        save_cart(&session, &cart).await?;
    }
    tracing::debug!(?change, "Cart clear");

    Ok(Json(CartView::from(&cart)))
}

/// The navigation badge count.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Json<CartCountView> {
    let cart = load_cart(&session).await;
    Json(CartCountView {
        count: cart.count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dusk_bullion_core::DisplayPrice;

    #[test]
    fn test_coerce_added_quantity() {
        assert_eq!(coerce_added_quantity(None), 1);
        assert_eq!(coerce_added_quantity(Some(3.0)), 3);
        assert_eq!(coerce_added_quantity(Some(2.9)), 2);
        assert_eq!(coerce_added_quantity(Some(0.0)), 1);
        assert_eq!(coerce_added_quantity(Some(-4.0)), 1);
        assert_eq!(coerce_added_quantity(Some(f64::NAN)), 1);
    }

    #[test]
    fn test_coerce_set_quantity() {
        assert_eq!(coerce_set_quantity(5.0), 5);
        // Fractional edits floor at one unit, they never remove.
        assert_eq!(coerce_set_quantity(0.5), 1);
        assert_eq!(coerce_set_quantity(2.7), 2);
        // Non-positive signals removal.
        assert_eq!(coerce_set_quantity(0.0), 0);
        assert_eq!(coerce_set_quantity(-1.0), 0);
        // Invalid input defaults to one, not an error.
        assert_eq!(coerce_set_quantity(f64::NAN), 1);
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add(CartLine {
            product_id: "au-bar-1oz-pamp".to_string(),
            name: "PAMP Suisse Classic (1oz Gold Bar)".to_string(),
            image: "/products/pamp-suisse-classic-1oz.jpg".to_string(),
            display_price: DisplayPrice::from_usd(2150.0),
            quantity: 2,
            weight_grams: Some(31.1035),
            premium_usd: Some(150.0),
        });

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert!((view.subtotal_usd - 4300.0).abs() < f64::EPSILON);
        assert_eq!(view.subtotal, "$4300.00");
        assert_eq!(view.items[0].line_price, "$4300.00");
        assert_eq!(view.items[0].price, "$2150.00");
    }

    #[test]
    fn test_view_wire_shape_is_camel_case() {
        let view = CartCountView { count: 3 };
        let json = serde_json::to_value(&view).expect("serialize");
        assert_eq!(json["count"], 3);

        let request: AddToCartRequest =
            serde_json::from_str(r#"{"productId": "au-bar-1oz-pamp", "quantity": 2}"#)
                .expect("parse");
        assert_eq!(request.product_id, "au-bar-1oz-pamp");
    }
}
