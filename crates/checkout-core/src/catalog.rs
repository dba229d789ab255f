//! # Local Demo Catalog
//!
//! Demo products defined inside the application. Loaded from TOML at
//! startup; local cart lines take their price and name from here so the
//! client never sets the price of a demo product.

use crate::cart::CartLine;
use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A demo product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoProduct {
    /// URL-safe identifier (e.g., "niacinamide")
    pub id: String,

    pub name: String,

    /// One-line description for listings
    #[serde(default)]
    pub description: String,

    /// Price in minor units
    pub price_cents: i64,

    #[serde(default)]
    pub image_url: String,

    #[serde(default)]
    pub category: String,

    #[serde(default = "default_true")]
    pub in_stock: bool,
}

fn default_true() -> bool {
    true
}

impl DemoProduct {
    pub fn price(&self, currency: Currency) -> Money {
        Money::from_minor(self.price_cents, currency)
    }
}

/// The demo product catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalCatalog {
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub products: Vec<DemoProduct>,
}

impl LocalCatalog {
    /// Create an empty catalog
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: DemoProduct) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&DemoProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn in_stock_products(&self) -> impl Iterator<Item = &DemoProduct> {
        self.products.iter().filter(|p| p.in_stock)
    }

    /// Build a cart line for a demo product, priced from the catalog
    pub fn line_for(&self, id: &str, quantity: u32) -> CheckoutResult<CartLine> {
        let product = self
            .get(id)
            .ok_or_else(|| CheckoutError::NotFound(format!("product {}", id)))?;

        if !product.in_stock {
            return Err(CheckoutError::Validation(format!(
                "{} is out of stock",
                product.name
            )));
        }

        Ok(
            CartLine::local(&product.id, &product.name, product.price_cents, quantity)?
                .with_image(&product.image_url),
        )
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> CheckoutResult<Self> {
        let catalog: Self = toml::from_str(toml_str)
            .map_err(|e| CheckoutError::Configuration(format!("invalid catalog: {}", e)))?;

        for product in &catalog.products {
            if product.price_cents < 0 {
                return Err(CheckoutError::Configuration(format!(
                    "negative price for {}",
                    product.id
                )));
            }
        }
        Ok(catalog)
    }
}
