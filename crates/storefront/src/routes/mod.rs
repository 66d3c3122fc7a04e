//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (pings the spot feed)
//!
//! # Products
//! GET  /products               - Product listing (filter: metal, form, in_stock)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (session-backed)
//! GET  /cart                   - Cart contents
//! POST /cart/add               - Add item (merges by product id)
//! POST /cart/update            - Set quantity (<= 0 removes the line)
//! POST /cart/remove            - Remove item
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Unit count badge
//!
//! # API
//! GET  /api/spot               - Live spot price payload (no-store)
//! POST /api/checkout           - Create a hosted checkout session
//! POST /api/payment-intent     - Create a payment intent
//! POST /api/identity/start     - Start identity verification
//! POST /api/payments/webhook   - Signed payment processor events
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod spot;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/spot", get(spot::show))
        .route("/checkout", post(checkout::checkout))
        .route("/payment-intent", post(checkout::payment_intent))
        .route("/identity/start", post(checkout::identity_start))
        .route("/payments/webhook", post(webhook::receive))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/api", api_routes())
}
