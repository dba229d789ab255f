//! # checkout-api
//!
//! HTTP API layer for glow-checkout-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Session carts driven through the checkout lifecycle
//! - One-shot checkout endpoints that take a cart snapshot
//! - Success and cancel pages for hosted card checkout
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/carts` | Create cart |
//! | GET | `/api/v1/carts/{id}` | Cart and checkout view |
//! | POST | `/api/v1/carts/{id}/lines` | Add line |
//! | POST | `/api/v1/carts/{id}/checkout` | Submit checkout |
//! | POST | `/api/v1/carts/{id}/checkout/confirm` | Verify embedded card payment |
//! | GET | `/api/v1/products` | List demo products |
//! | POST | `/api/checkout/shopify` | Shopify checkout for a snapshot |
//! | POST | `/api/checkout/stripe` | Stripe Checkout session for a snapshot |
//! | POST | `/api/checkout/stripe/payment-intent` | Payment intent for a snapshot |

pub mod handlers;
pub mod routes;
pub mod sessions;
pub mod state;

pub use routes::create_router;
pub use sessions::SessionStore;
pub use state::{AppConfig, AppState};
