//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the wired-in backends, configuration, demo catalog and the
//! per-shopper cart sessions.

use crate::sessions::SessionStore;
use checkout_core::{Backends, Capabilities, CardFlow, CheckoutUrls, LocalCatalog};
use checkout_shopify::{ShopifyConfig, ShopifyStorefront};
use checkout_stripe::{StripeCardProcessor, StripeConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for redirects back to the storefront
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Bounded wait for each backend round trip
    pub checkout_timeout: Duration,
    /// How long a demo confirmation stays up before the cart is cleared
    pub demo_clear_delay: Duration,
    /// Explicit demo catalog path; the usual locations are searched otherwise
    pub catalog_path: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            checkout_timeout: Duration::from_secs(
                std::env::var("CHECKOUT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            demo_clear_delay: Duration::from_millis(
                std::env::var("DEMO_CLEAR_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3_000),
            ),
            catalog_path: std::env::var("CATALOG_PATH").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}: {}", addr, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            checkout_timeout: Duration::from_secs(30),
            demo_clear_delay: Duration::from_millis(3_000),
            catalog_path: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Commerce backend and card processor, when configured
    pub backends: Backends,
    /// Demo products
    pub catalog: Arc<LocalCatalog>,
    /// Carts by session id
    pub sessions: SessionStore,
    /// Redirect targets for hosted card sessions
    pub urls: CheckoutUrls,
    /// Handed to the browser for the embedded card form
    pub stripe_publishable_key: Option<String>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment. Backends whose configuration is
    /// missing are left out; the checkout view reflects that.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog(config.catalog_path.as_deref())?;

        let mut backends = Backends::new();
        let mut stripe_publishable_key = None;

        let stripe_config = StripeConfig::from_env();
        match stripe_config.validate() {
            Ok(()) => {
                stripe_publishable_key = Some(stripe_config.publishable_key.clone());
                let processor =
                    StripeCardProcessor::with_timeout(stripe_config, config.checkout_timeout)
                        .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
                backends = backends.with_card(Arc::new(processor));
            }
            Err(e) => info!("Card payments disabled: {}", e),
        }

        match ShopifyConfig::from_env() {
            Ok(shopify_config) => {
                let storefront =
                    ShopifyStorefront::with_timeout(shopify_config, config.checkout_timeout)
                        .map_err(|e| anyhow::anyhow!("Failed to initialize Shopify: {}", e))?;
                backends = backends.with_commerce(Arc::new(storefront));
            }
            Err(e) => warn!("Shopify checkout disabled: {}", e),
        }

        let mut state = Self::from_parts(config, catalog, backends);
        state.stripe_publishable_key = stripe_publishable_key;
        Ok(state)
    }

    /// Assemble state from already-built pieces
    pub fn from_parts(config: AppConfig, catalog: LocalCatalog, backends: Backends) -> Self {
        Self {
            urls: CheckoutUrls::new(&config.base_url),
            backends,
            catalog: Arc::new(catalog),
            sessions: SessionStore::new(),
            stripe_publishable_key: None,
            config,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backends.capabilities()
    }

    /// Card flow for a submission: embedded form or hosted redirect
    pub fn card_flow(&self, embedded: bool) -> CardFlow {
        if embedded {
            CardFlow::Embedded
        } else {
            CardFlow::HostedSession {
                success_url: self.urls.success_url_with_session(),
                cancel_url: self.urls.cancel_url(),
            }
        }
    }
}

/// Load the demo catalog from config
fn load_product_catalog(explicit: Option<&str>) -> anyhow::Result<LocalCatalog> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        return parse_catalog(path, &content);
    }

    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_catalog(path, &content);
        }
    }

    // Return empty catalog if no config found
    warn!("No demo catalog found, using empty catalog");
    Ok(LocalCatalog::default())
}

fn parse_catalog(path: &str, content: &str) -> anyhow::Result<LocalCatalog> {
    let catalog = LocalCatalog::from_toml(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    info!("Loaded {} demo products from {}", catalog.products.len(), path);
    Ok(catalog)
}
