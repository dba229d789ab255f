//! # checkout-stripe
//!
//! Stripe card processor for glow-checkout-rs.
//!
//! Two ways to take a card payment:
//!
//! 1. **Hosted Checkout Session** - redirect to Stripe's page
//!    - Shipping and billing address collection
//!    - Shipping and tax as separate line items
//!
//! 2. **Embedded PaymentIntent** - card form on our checkout page
//!    - Returns a client secret for Stripe.js
//!    - Confirmed afterwards by retrieving the intent
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_stripe::{StripeCardProcessor, StripeConfig};
//!
//! let config = StripeConfig::from_env();
//! if config.is_configured() {
//!     let processor = StripeCardProcessor::new(config)?;
//!     backends = backends.with_card(Arc::new(processor));
//! }
//! ```

pub mod config;
pub mod form;
pub mod processor;

// Re-exports
pub use config::StripeConfig;
pub use form::{payment_intent_form_params, session_form_params, SHIPPING_COUNTRIES};
pub use processor::StripeCardProcessor;
