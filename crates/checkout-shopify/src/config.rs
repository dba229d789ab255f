//! # Shopify Configuration
//!
//! Storefront API settings, loaded from environment variables.

use checkout_core::CheckoutError;
use std::env;

const DEFAULT_API_VERSION: &str = "2023-10";

/// Shopify Storefront API configuration
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Store domain (e.g., "glow-skincare.myshopify.com")
    pub store_domain: String,

    /// Public Storefront access token
    pub storefront_access_token: String,

    /// Storefront API version
    pub api_version: String,

    /// Full GraphQL endpoint override (for testing/mocking)
    pub endpoint_override: Option<String>,
}

impl ShopifyConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SHOPIFY_STORE_DOMAIN`
    /// - `SHOPIFY_STOREFRONT_ACCESS_TOKEN`
    ///
    /// Optional: `SHOPIFY_API_VERSION` (default 2023-10)
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_domain = env::var("SHOPIFY_STORE_DOMAIN").map_err(|_| {
            CheckoutError::Configuration("SHOPIFY_STORE_DOMAIN not set".to_string())
        })?;

        let storefront_access_token = env::var("SHOPIFY_STOREFRONT_ACCESS_TOKEN").map_err(|_| {
            CheckoutError::Configuration("SHOPIFY_STOREFRONT_ACCESS_TOKEN not set".to_string())
        })?;

        let config = Self {
            store_domain,
            storefront_access_token,
            api_version: env::var("SHOPIFY_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            endpoint_override: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(store_domain: impl Into<String>, storefront_access_token: impl Into<String>) -> Self {
        Self {
            store_domain: store_domain.into(),
            storefront_access_token: storefront_access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            endpoint_override: None,
        }
    }

    pub fn validate(&self) -> Result<(), CheckoutError> {
        let domain = self.store_domain.trim();
        if domain.is_empty() || domain.contains('/') {
            return Err(CheckoutError::Configuration(
                "SHOPIFY_STORE_DOMAIN must be a bare host name".to_string(),
            ));
        }
        if self.storefront_access_token.trim().is_empty() {
            return Err(CheckoutError::Configuration(
                "SHOPIFY_STOREFRONT_ACCESS_TOKEN is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// GraphQL endpoint for this store
    pub fn endpoint(&self) -> String {
        match &self.endpoint_override {
            Some(url) => url.clone(),
            None => format!(
                "https://{}/api/{}/graphql.json",
                self.store_domain.trim(),
                self.api_version
            ),
        }
    }

    /// Builder: send requests somewhere else (for testing)
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_override = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = ShopifyConfig::new("glow.myshopify.com", "token");
        assert_eq!(
            config.endpoint(),
            "https://glow.myshopify.com/api/2023-10/graphql.json"
        );

        let mocked = config.with_endpoint("http://127.0.0.1:9999/graphql");
        assert_eq!(mocked.endpoint(), "http://127.0.0.1:9999/graphql");
    }

    #[test]
    fn test_validate() {
        assert!(ShopifyConfig::new("glow.myshopify.com", "token").validate().is_ok());
        assert!(ShopifyConfig::new("https://glow.myshopify.com/", "token")
            .validate()
            .is_err());
        assert!(ShopifyConfig::new("glow.myshopify.com", " ").validate().is_err());
    }
}
