//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables.

use checkout_core::CheckoutError;
use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2025-04-30.basil";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Publishable key (pk_test_... or pk_live_...), handed to the browser
    /// for the embedded form
    pub publishable_key: String,

    /// Feature switch; keys alone do not enable card payments
    pub enabled: bool,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `STRIPE_SECRET_KEY`, `STRIPE_PUBLISHABLE_KEY` and
    /// `STRIPE_ENABLED`. Missing values are not an error here; check
    /// [`StripeConfig::is_configured`] before wiring the processor in.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let enabled = env::var("STRIPE_ENABLED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            publishable_key: env::var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default(),
            enabled,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            enabled: true,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Card payments are on and both keys look like Stripe keys
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// Explain why the config cannot be used
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if !self.enabled {
            return Err(CheckoutError::Configuration(
                "Stripe is disabled (STRIPE_ENABLED)".to_string(),
            ));
        }

        if !self.secret_key.starts_with("sk_test_") && !self.secret_key.starts_with("sk_live_") {
            return Err(CheckoutError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        if !self.publishable_key.starts_with("pk_test_")
            && !self.publishable_key.starts_with("pk_live_")
        {
            return Err(CheckoutError::Configuration(
                "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: flip the feature switch
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
