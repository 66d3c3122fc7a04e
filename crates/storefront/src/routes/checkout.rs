//! Checkout, payment-intent, and identity-start handlers.
//!
//! Every payable amount that leaves these handlers is recomputed server-side
//! from a freshly fetched (never cached) spot price. Client-supplied prices
//! are never read; only product identity, weight, premium, and quantity feed
//! the recomputation, and catalog data wins over the payload for any product
//! the catalog knows.

use axum::{Json, extract::State, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dusk_bullion_core::{
    GRAMS_PER_TROY_OUNCE, OrderLine, PricedOrder, identity_required, recompute_order_total,
};

use crate::catalog;
use crate::error::Result;
use crate::payments::{CheckoutSessionParams, OrderMetadata, SessionLineItem};
use crate::state::AppState;

/// One line of a client checkout payload.
///
/// `unitPriceUsd` and similar display fields are deliberately absent: the
/// client cannot send a price.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub qty: f64,
    #[serde(default)]
    pub weight_grams: Option<f64>,
    #[serde(default)]
    pub premium_usd: Option<f64>,
}

/// Buyer context for the identity gate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub identity_verified: bool,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub buyer: Option<Buyer>,
}

/// Successful checkout: redirect the shopper to the hosted payment page.
#[derive(Debug, Serialize)]
pub struct CheckoutRedirect {
    pub url: String,
}

/// Checkout halted: the order crossed the identity threshold and the buyer
/// has not verified.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedIdentity {
    pub need_identity: bool,
    pub subtotal_usd: f64,
}

/// Payment intent response for the embedded payment flow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub amount_usd: f64,
}

/// Identity verification start request. Snake-case on the wire.
#[derive(Debug, Deserialize)]
pub struct IdentityStartRequest {
    pub return_url: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Identity verification start response.
#[derive(Debug, Serialize)]
pub struct IdentityStartResponse {
    pub url: String,
}

/// A checkout item resolved against the catalog.
struct ResolvedItem {
    product_id: String,
    name: String,
    image: Option<String>,
    brand: Option<String>,
    weight_grams: f64,
    premium_usd: f64,
    quantity: u32,
}

/// Resolve payload items against the catalog.
///
/// Known product ids take weight, premium, name, and image from the catalog
/// regardless of what the payload claims; unknown ids fall back to the
/// payload's own weight/premium (defaulting to one troy ounce, zero premium).
fn resolve_items(items: &[CheckoutItem]) -> Vec<ResolvedItem> {
    items
        .iter()
        .map(|item| {
            let quantity = coerce_quantity(item.qty);
            match catalog::get_product_by_id(&item.id) {
                Some(product) => ResolvedItem {
                    product_id: product.id.to_string(),
                    name: product.name.to_string(),
                    image: Some(product.image.to_string()),
                    brand: Some(product.brand.to_string()),
                    weight_grams: product.weight_grams,
                    premium_usd: product.premium_usd,
                    quantity,
                },
                None => ResolvedItem {
                    product_id: item.id.clone(),
                    name: item.name.clone(),
                    image: item.image.clone(),
                    brand: None,
                    weight_grams: item
                        .weight_grams
                        .filter(|w| w.is_finite() && *w > 0.0)
                        .unwrap_or(GRAMS_PER_TROY_OUNCE),
                    premium_usd: item.premium_usd.filter(|p| p.is_finite()).unwrap_or(0.0),
                    quantity,
                },
            }
        })
        .collect()
}

fn coerce_quantity(raw: f64) -> u32 {
    if raw.is_finite() && raw >= 1.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            raw.trunc().min(f64::from(u32::MAX)) as u32
        }
    } else {
        1
    }
}

fn order_lines(resolved: &[ResolvedItem]) -> Vec<OrderLine> {
    resolved
        .iter()
        .map(|item| OrderLine {
            weight_grams: Some(item.weight_grams),
            premium_usd: Some(item.premium_usd),
            quantity: item.quantity,
        })
        .collect()
}

/// Recompute the order against a freshly fetched spot price.
///
/// The empty-cart check runs before the network call so an empty payload
/// never costs an upstream request.
async fn price_order(state: &AppState, resolved: &[ResolvedItem]) -> Result<(f64, PricedOrder)> {
    let lines = order_lines(resolved);
    if lines.is_empty() {
        return Err(dusk_bullion_core::CheckoutError::EmptyCart.into());
    }
    let spot = state.spot().fresh().await?;
    let order = recompute_order_total(spot.usd_per_oz, &lines)?;
    Ok((spot.usd_per_oz, order))
}

/// Create a hosted checkout session, or halt with a verification instruction
/// when the identity gate trips.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response> {
    let resolved = resolve_items(&request.items);
    let (spot_usd_per_oz, order) = price_order(&state, &resolved).await?;
    let buyer = request.buyer.unwrap_or_default();

    let subtotal_usd = order.totals.subtotal.as_usd();
    if identity_required(
        subtotal_usd,
        state.config().identity_threshold_usd,
        buyer.identity_verified,
    ) {
        tracing::info!(subtotal_usd, "Checkout halted for identity verification");
        return Ok(Json(NeedIdentity {
            need_identity: true,
            subtotal_usd,
        })
        .into_response());
    }

    let base_url = &state.config().base_url;
    let line_items = resolved
        .iter()
        .zip(&order.lines)
        .map(|(item, priced)| SessionLineItem {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            image: item.image.clone(),
            brand: item.brand.clone(),
            weight_grams: item.weight_grams,
            quantity: priced.quantity,
            unit_price: priced.unit_price,
        })
        .collect();

    let session = state
        .payments()
        .create_checkout_session(&CheckoutSessionParams {
            customer_email: buyer.email,
            line_items,
            shipping: order.totals.shipping,
            success_url: format!("{base_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base_url}/cart"),
            metadata: OrderMetadata {
                spot_usd_per_oz,
                subtotal: order.totals.subtotal,
                shipping: order.totals.shipping,
            },
        })
        .await?;

    // create_checkout_session guarantees the url is present.
    let url = session.url.unwrap_or_default();
    tracing::info!(session_id = %session.id, "Checkout session created");
    Ok(Json(CheckoutRedirect { url }).into_response())
}

/// Create a payment intent for the embedded payment flow.
///
/// Same recomputation as [`checkout`]; the intent amount is the verified
/// total in cents.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let resolved = resolve_items(&request.items);
    let (spot_usd_per_oz, order) = price_order(&state, &resolved).await?;
    let buyer = request.buyer.unwrap_or_default();

    let intent = state
        .payments()
        .create_payment_intent(
            order.totals.total,
            buyer.email.as_deref(),
            &OrderMetadata {
                spot_usd_per_oz,
                subtotal: order.totals.subtotal,
                shipping: order.totals.shipping,
            },
        )
        .await?;

    tracing::info!(intent_id = %intent.id, "Payment intent created");
    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret.unwrap_or_default(),
        amount_usd: order.totals.total.as_usd(),
    }))
}

/// Start an identity verification session and return its redirect URL.
#[instrument(skip(state, request))]
pub async fn identity_start(
    State(state): State<AppState>,
    Json(request): Json<IdentityStartRequest>,
) -> Result<Json<IdentityStartResponse>> {
    let session = state
        .payments()
        .create_identity_session(&request.return_url, request.user_email.as_deref())
        .await?;

    tracing::info!(session_id = %session.id, "Identity verification session created");
    Ok(Json(IdentityStartResponse {
        url: session.url.unwrap_or_default(),
    }))
}
