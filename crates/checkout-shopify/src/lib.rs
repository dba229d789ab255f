//! # checkout-shopify
//!
//! Shopify Storefront API commerce backend for glow-checkout-rs.
//!
//! Only `checkoutCreate` is used: the external lines of a cart become a
//! hosted Shopify checkout and the shopper is redirected to its `webUrl`.
//! Both `userErrors` and `checkoutUserErrors` come back as a single
//! backend rejection carrying every message.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_shopify::ShopifyStorefront;
//!
//! let storefront = ShopifyStorefront::from_env()?;
//! backends = backends.with_commerce(Arc::new(storefront));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod queries;
pub mod types;

// Re-exports
pub use client::ShopifyStorefront;
pub use config::ShopifyConfig;
pub use error::ShopifyError;
