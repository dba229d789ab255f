//! # Backend Traits
//!
//! Seams for the two remote backends. Concrete clients live in their own
//! crates and are injected into the orchestrator as trait objects.
//!
//! ```text
//!  ┌──────────────────────────┐      ┌──────────────────────────┐
//!  │ CommerceBackend (trait)  │      │ CardProcessor (trait)    │
//!  │  └── create_checkout()   │      │  ├── create_session()    │
//!  └────────────▲─────────────┘      │  ├── create_payment_intent()
//!               │                    │  └── retrieve_payment_intent()
//!  ┌────────────┴─────────────┐      └────────────▲─────────────┘
//!  │ ShopifyStorefront        │      ┌────────────┴─────────────┐
//!  │ (checkout-shopify)       │      │ StripeCardProcessor      │
//!  └──────────────────────────┘      │ (checkout-stripe)        │
//!                                    └──────────────────────────┘
//! ```

use crate::eligibility::Capabilities;
use crate::error::CheckoutResult;
use crate::money::Currency;
use crate::payload::{CardCheckoutRequest, ExternalCheckoutRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hosted checkout created by the commerce backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCheckout {
    pub checkout_id: String,
    /// Where to send the shopper
    pub web_url: String,
    pub total_minor: i64,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub currency: Currency,
}

impl ExternalCheckout {
    /// Totals as the commerce backend computed them
    pub fn totals(&self) -> BackendTotals {
        BackendTotals {
            subtotal: self.subtotal_minor,
            tax: self.tax_minor,
            total: self.total_minor,
            currency: self.currency,
        }
    }
}

/// Totals reported back by a backend, in minor units. These can differ from
/// the submitted pricing when the backend applies its own shipping or tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: Currency,
}

/// Hosted card session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSession {
    pub session_id: String,
    /// Hosted payment page
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payment intent created for the embedded form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentHandle {
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// Payment intent status as reported by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Canceled,
    Other(String),
}

impl PaymentIntentStatus {
    /// Parse Stripe's status string
    pub fn from_stripe(status: &str) -> Self {
        match status {
            "succeeded" => PaymentIntentStatus::Succeeded,
            "processing" => PaymentIntentStatus::Processing,
            "requires_payment_method" => PaymentIntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => PaymentIntentStatus::RequiresConfirmation,
            "requires_action" => PaymentIntentStatus::RequiresAction,
            "canceled" => PaymentIntentStatus::Canceled,
            other => PaymentIntentStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentIntentStatus::Succeeded => "succeeded",
            PaymentIntentStatus::Processing => "processing",
            PaymentIntentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentIntentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Canceled => "canceled",
            PaymentIntentStatus::Other(s) => s,
        }
    }
}

/// Third-party commerce backend that owns the external catalog and hosts
/// its own checkout page.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Create a hosted checkout for the external lines in `request`.
    ///
    /// Explicit validation errors from the backend come back as
    /// `CheckoutError::BackendRejection`, one message per error.
    async fn create_checkout(
        &self,
        request: &ExternalCheckoutRequest,
    ) -> CheckoutResult<ExternalCheckout>;

    /// Get the provider name (for logging and error messages).
    fn provider_name(&self) -> &'static str;
}

/// Card payment processor
#[async_trait]
pub trait CardProcessor: Send + Sync {
    /// Create a hosted session and return its redirect URL.
    ///
    /// `idempotency_key` is unique per submission attempt.
    async fn create_session(
        &self,
        request: &CardCheckoutRequest,
        idempotency_key: &str,
    ) -> CheckoutResult<CardSession>;

    /// Create a payment intent for the embedded form.
    async fn create_payment_intent(
        &self,
        request: &CardCheckoutRequest,
        idempotency_key: &str,
    ) -> CheckoutResult<PaymentIntentHandle>;

    /// Look up a payment intent to confirm the embedded form result.
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> CheckoutResult<PaymentIntentStatus>;

    fn provider_name(&self) -> &'static str;
}

pub type SharedCommerceBackend = Arc<dyn CommerceBackend>;
pub type SharedCardProcessor = Arc<dyn CardProcessor>;

/// The backends available to this deployment
#[derive(Clone, Default)]
pub struct Backends {
    pub commerce: Option<SharedCommerceBackend>,
    pub card: Option<SharedCardProcessor>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commerce(mut self, backend: SharedCommerceBackend) -> Self {
        self.commerce = Some(backend);
        self
    }

    pub fn with_card(mut self, processor: SharedCardProcessor) -> Self {
        self.card = Some(processor);
        self
    }

    /// Capability flags derived from what is wired in
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.card.is_some())
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("commerce", &self.commerce.as_ref().map(|b| b.provider_name()))
            .field("card", &self.card.as_ref().map(|c| c.provider_name()))
            .finish()
    }
}

/// Redirect targets for hosted card sessions
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the storefront (e.g., "https://glow.example")
    pub base_url: String,
    /// Success page path (e.g., "/checkout/success")
    pub success_path: String,
    /// Where a cancelled session returns to
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            success_path: "/checkout/success".to_string(),
            cancel_path: "/checkout".to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}{}", self.base_url, self.success_path)
    }

    /// Success URL with Stripe's session placeholder
    pub fn success_url_with_session(&self) -> String {
        format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.success_url())
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_urls() {
        let urls = CheckoutUrls::new("https://glow.example/");

        assert_eq!(urls.success_url(), "https://glow.example/checkout/success");
        assert_eq!(
            urls.success_url_with_session(),
            "https://glow.example/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(urls.cancel_url(), "https://glow.example/checkout");
    }

    #[test]
    fn test_capabilities_follow_card_wiring() {
        assert!(!Backends::new().capabilities().card_processor_configured);
    }

    #[test]
    fn test_intent_status_parsing() {
        assert_eq!(
            PaymentIntentStatus::from_stripe("succeeded"),
            PaymentIntentStatus::Succeeded
        );
        assert_eq!(
            PaymentIntentStatus::from_stripe("requires_capture"),
            PaymentIntentStatus::Other("requires_capture".to_string())
        );
        assert_eq!(PaymentIntentStatus::Canceled.as_str(), "canceled");
    }
}
