//! Product route handlers.
//!
//! Listings carry live display prices quoted from the (short-TTL cached)
//! spot price. When the feed is down the products are still listed, just
//! without prices; only checkout requires a live price.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dusk_bullion_core::{money, quote};

use crate::catalog::{self, Form, Metal, Product};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: &'static str,
    pub sku: &'static str,
    pub name: &'static str,
    pub metal: Metal,
    pub form: Form,
    pub weight_grams: f64,
    pub purity: &'static str,
    pub premium_usd: f64,
    pub brand: &'static str,
    pub country: &'static str,
    pub image: &'static str,
    pub in_stock: bool,
    /// Live quoted unit price; absent while the spot feed is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price_usd: Option<f64>,
    /// Formatted unit price (e.g., "$2150.00").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl ProductView {
    fn new(product: &'static Product, spot_usd_per_oz: Option<f64>) -> Self {
        let unit_price_usd = spot_usd_per_oz.and_then(|spot| {
            quote(spot, Some(product.weight_grams), Some(product.premium_usd))
                .map(|p| p.as_usd())
        });

        Self {
            id: product.id,
            sku: product.sku,
            name: product.name,
            metal: product.metal,
            form: product.form,
            weight_grams: product.weight_grams,
            purity: product.purity,
            premium_usd: product.premium_usd,
            brand: product.brand,
            country: product.country,
            image: product.image,
            in_stock: product.in_stock,
            unit_price_usd,
            price: unit_price_usd.map(money::format_usd),
        }
    }
}

/// Listing filter query.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Filter by metal ("GOLD" / "SILVER", case-insensitive).
    pub metal: Option<String>,
    /// Filter by form ("BAR" / "COIN", case-insensitive).
    pub form: Option<String>,
    /// When true, only purchasable products.
    pub in_stock: Option<bool>,
}

fn matches_filters(product: &Product, query: &ProductQuery) -> bool {
    if let Some(metal) = &query.metal {
        let want = match metal.to_ascii_uppercase().as_str() {
            "GOLD" => Some(Metal::Gold),
            "SILVER" => Some(Metal::Silver),
            _ => None,
        };
        if want != Some(product.metal) {
            return false;
        }
    }
    if let Some(form) = &query.form {
        let want = match form.to_ascii_uppercase().as_str() {
            "BAR" => Some(Form::Bar),
            "COIN" => Some(Form::Coin),
            _ => None,
        };
        if want != Some(product.form) {
            return false;
        }
    }
    if query.in_stock == Some(true) && !product.in_stock {
        return false;
    }
    true
}

/// List the catalog with live display prices.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<ProductView>> {
    let spot = state.spot().latest().await.ok().map(|s| s.usd_per_oz);

    let views = catalog::PRODUCTS
        .iter()
        .filter(|p| matches_filters(p, &query))
        .map(|p| ProductView::new(p, spot))
        .collect();

    Json(views)
}

/// Product detail with a live display price.
#[instrument(skip(state), fields(id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let product = catalog::get_product_by_id(&id)
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))?;

    let spot = state.spot().latest().await.ok().map(|s| s.usd_per_oz);
    Ok(Json(ProductView::new(product, spot)))
}
