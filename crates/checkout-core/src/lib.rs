//! # checkout-core
//!
//! Core types and traits for the glow storefront checkout engine.
//!
//! This crate provides:
//! - `Cart` and `CartLine` with per-line provenance (external or local demo)
//! - `PriceBreakdown`, the single shipping/tax/total calculation
//! - `resolve` for payment path eligibility and default selection
//! - Pure payload builders for each payment path
//! - `CommerceBackend` and `CardProcessor` traits for the remote backends
//! - `CheckoutFlow`, the one-attempt-at-a-time checkout state machine
//! - `LocalCatalog` for demo products
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{Backends, CardFlow, Cart, CheckoutFlow, ShopperDetails};
//!
//! let mut flow = CheckoutFlow::new(Cart::default());
//! flow.add_line(catalog.line_for("niacinamide", 1)?)?;
//!
//! let view = flow.view(backends.capabilities());
//! // Render view.options, view.selection and view.pricing
//!
//! let outcome = flow
//!     .submit(None, &ShopperDetails::default(), CardFlow::Embedded, &backends, timeout)
//!     .await?;
//! ```

pub mod backend;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod eligibility;
pub mod error;
pub mod money;
pub mod payload;
pub mod pricing;

// Re-exports for convenience
pub use backend::{
    BackendTotals, Backends, CardProcessor, CardSession, CheckoutUrls, CommerceBackend, ExternalCheckout,
    PaymentIntentHandle, PaymentIntentStatus, SharedCardProcessor, SharedCommerceBackend,
};
pub use cart::{
    Cart, CartComposition, CartLine, ItemSource, MAX_LINE_QUANTITY, MAX_UNIT_PRICE_MINOR,
};
pub use catalog::{DemoProduct, LocalCatalog};
pub use checkout::{
    dispatch, verify_payment, BackendResponse, CheckoutFailure, CheckoutFlow, CheckoutReceipt,
    CheckoutState, CheckoutView, ConfirmationOutcome, ConfirmationTicket, SubmissionTicket,
    SubmitOutcome, SubmitPhase, DEFAULT_BACKEND_TIMEOUT,
};
pub use eligibility::{
    resolve, Capabilities, Eligibility, PathSelection, PaymentPath, PaymentPathOption,
};
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use money::{format_minor, Currency, Money};
pub use payload::{
    build_card_checkout, build_demo_checkout, build_external_checkout, build_payload,
    CardCheckoutRequest, CardFlow, CardLineItem, CheckoutPayload, DemoConfirmation,
    ExternalCheckoutRequest, ShippingAddress, ShopperDetails, VariantLine,
};
pub use pricing::{
    PriceBreakdown, PriceSummary, FLAT_SHIPPING_MINOR, FREE_SHIPPING_THRESHOLD_MINOR,
    MAX_SUBTOTAL_MINOR, TAX_RATE_BASIS_POINTS,
};
