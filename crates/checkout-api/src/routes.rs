//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Session carts:
///   - POST   /api/v1/carts - Create an empty cart
///   - GET    /api/v1/carts/{cart_id} - Cart, payment options and pricing
///   - DELETE /api/v1/carts/{cart_id} - Drop a cart
///   - POST   /api/v1/carts/{cart_id}/lines - Add a line
///   - DELETE /api/v1/carts/{cart_id}/lines - Clear the cart
///   - PATCH  /api/v1/carts/{cart_id}/lines/{index} - Change quantity
///   - DELETE /api/v1/carts/{cart_id}/lines/{index} - Remove a line
///   - POST   /api/v1/carts/{cart_id}/checkout - Submit
///   - POST   /api/v1/carts/{cart_id}/checkout/confirm - Verify embedded card payment
///   - POST   /api/v1/carts/{cart_id}/checkout/reset - Abandon or dismiss
///
/// - Catalog and settings:
///   - GET /api/v1/products
///   - GET /api/v1/products/{product_id}
///   - GET /api/v1/checkout/config
///
/// - One-shot checkout with a cart snapshot:
///   - POST /api/checkout/shopify
///   - POST /api/checkout/stripe
///   - POST /api/checkout/stripe/payment-intent
///
/// - Static pages:
///   - GET /checkout/success - Success page
///   - GET /checkout, /checkout/cancel - Cancel page
pub fn create_router(state: AppState) -> Router {
    // Storefront is served from a different origin in development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Session carts
        .route("/carts", post(handlers::create_cart))
        .route(
            "/carts/{cart_id}",
            get(handlers::get_cart).delete(handlers::delete_cart),
        )
        .route(
            "/carts/{cart_id}/lines",
            post(handlers::add_line).delete(handlers::clear_cart),
        )
        .route(
            "/carts/{cart_id}/lines/{index}",
            patch(handlers::update_line).delete(handlers::remove_line),
        )
        // Checkout lifecycle
        .route("/carts/{cart_id}/checkout", post(handlers::submit_checkout))
        .route(
            "/carts/{cart_id}/checkout/confirm",
            post(handlers::confirm_payment),
        )
        .route(
            "/carts/{cart_id}/checkout/reset",
            post(handlers::reset_checkout),
        )
        // Catalog and settings
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route("/checkout/config", get(handlers::checkout_config));

    let one_shot_routes = Router::new()
        .route("/shopify", post(handlers::shopify_checkout))
        .route("/stripe", post(handlers::stripe_checkout))
        .route(
            "/stripe/payment-intent",
            post(handlers::stripe_payment_intent),
        );

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // Hosted card checkout returns here
        .route("/checkout", get(handlers::checkout_cancel))
        .route("/checkout/success", get(handlers::checkout_success))
        .route("/checkout/cancel", get(handlers::checkout_cancel))
        // API
        .nest("/api/v1", api_routes)
        .nest("/api/checkout", one_shot_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
