//! # Cart Types
//!
//! The shopper's cart: an ordered list of lines, each tagged with where its
//! product record lives. Totals and composition flags are derived on demand.

use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{format_minor, Currency, Money};
use crate::pricing::MAX_SUBTOTAL_MINOR;
use serde::{Deserialize, Serialize};

/// Largest unit price a line may carry (999,999.99)
pub const MAX_UNIT_PRICE_MINOR: i64 = 99_999_999;

/// Largest quantity a single line may hold
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Where the canonical product record for a line lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Product sold through the third-party commerce backend
    External,
    /// Demo product defined inside the application
    Local,
}

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Provenance of the product
    pub source: ItemSource,

    /// Product ID (commerce backend GID or local catalog id)
    pub item_id: String,

    /// Variant ID (external products)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,

    /// Unit price in minor currency units
    pub unit_price_minor: i64,

    /// Quantity, at least 1
    pub quantity: u32,

    /// Product name (denormalized for display)
    pub display_name: String,

    /// Product image
    #[serde(default)]
    pub image_url: String,
}

impl CartLine {
    /// Create a line for a commerce-backend product
    pub fn external(
        item_id: impl Into<String>,
        variant_id: Option<String>,
        display_name: impl Into<String>,
        unit_price_minor: i64,
        quantity: u32,
    ) -> CheckoutResult<Self> {
        let line = Self {
            source: ItemSource::External,
            item_id: item_id.into(),
            variant_id,
            unit_price_minor,
            quantity,
            display_name: display_name.into(),
            image_url: String::new(),
        };
        line.validate()?;
        Ok(line)
    }

    /// Create a line for a local demo product
    pub fn local(
        item_id: impl Into<String>,
        display_name: impl Into<String>,
        unit_price_minor: i64,
        quantity: u32,
    ) -> CheckoutResult<Self> {
        let line = Self {
            source: ItemSource::Local,
            item_id: item_id.into(),
            variant_id: None,
            unit_price_minor,
            quantity,
            display_name: display_name.into(),
            image_url: String::new(),
        };
        line.validate()?;
        Ok(line)
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Check the line invariants
    pub fn validate(&self) -> CheckoutResult<()> {
        if self.item_id.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "cart line is missing an item id".to_string(),
            ));
        }
        if self.quantity == 0 {
            return Err(CheckoutError::Validation(format!(
                "quantity for {} must be at least 1",
                self.item_id
            )));
        }
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(CheckoutError::Validation(format!(
                "quantity for {} cannot exceed {}",
                self.item_id, MAX_LINE_QUANTITY
            )));
        }
        if self.unit_price_minor < 0 {
            return Err(CheckoutError::Validation(format!(
                "price for {} cannot be negative",
                self.item_id
            )));
        }
        if self.unit_price_minor > MAX_UNIT_PRICE_MINOR {
            return Err(CheckoutError::Validation(format!(
                "price for {} cannot exceed {}",
                self.item_id,
                format_minor(MAX_UNIT_PRICE_MINOR)
            )));
        }
        Ok(())
    }

    /// Whether this line is sold through the commerce backend
    pub fn is_external(&self) -> bool {
        self.source == ItemSource::External
    }

    /// Reference the commerce backend charges against: the variant when
    /// known, otherwise the product itself
    pub fn variant_reference(&self) -> &str {
        self.variant_id.as_deref().unwrap_or(&self.item_id)
    }

    /// Unit price times quantity, in minor units
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor.saturating_mul(i64::from(self.quantity))
    }

    fn same_item(&self, other: &CartLine) -> bool {
        self.source == other.source
            && self.item_id == other.item_id
            && self.variant_id == other.variant_id
    }
}

/// What kinds of lines a cart holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartComposition {
    Empty,
    ExternalOnly,
    LocalOnly,
    Mixed,
}

impl CartComposition {
    /// Notice shown next to the checkout options
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            CartComposition::Empty => None,
            CartComposition::ExternalOnly => {
                Some("Your cart contains real store products that can be purchased.")
            }
            CartComposition::LocalOnly => {
                Some("Your cart contains only demo products. This will be a demo checkout.")
            }
            CartComposition::Mixed => Some(
                "Your cart contains both store products and demo products. \
                 Demo products will not be charged through store checkout.",
            ),
        }
    }
}

/// The shopper's cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    currency: Currency,
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            lines: Vec::new(),
        }
    }

    /// Rebuild a cart from a client-supplied snapshot, validating every line.
    /// Order is preserved and lines are not merged.
    pub fn from_lines(currency: Currency, lines: Vec<CartLine>) -> CheckoutResult<Self> {
        for line in &lines {
            line.validate()?;
        }
        checked_subtotal(&lines)?;
        Ok(Self { currency, lines })
    }

    /// Cart currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// All lines, in insertion order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Add a line. A line for the same item and variant is merged by summing
    /// quantities. Returns the index of the affected line.
    ///
    /// The cart is left unchanged when the merged line or the new subtotal
    /// would exceed the limits.
    pub fn add(&mut self, line: CartLine) -> CheckoutResult<usize> {
        line.validate()?;

        let mut next = self.lines.clone();
        let index = match next.iter().position(|l| l.same_item(&line)) {
            Some(index) => {
                let existing = &mut next[index];
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.validate()?;
                index
            }
            None => {
                next.push(line);
                next.len() - 1
            }
        };

        checked_subtotal(&next)?;
        self.lines = next;
        Ok(index)
    }

    /// Change the quantity of a line. Zero removes the line.
    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> CheckoutResult<()> {
        if index >= self.lines.len() {
            return Err(CheckoutError::NotFound(format!("cart line {}", index)));
        }
        if quantity == 0 {
            self.lines.remove(index);
            return Ok(());
        }

        let mut line = self.lines[index].clone();
        line.quantity = quantity;
        line.validate()?;

        let mut next = self.lines.clone();
        next[index] = line;
        checked_subtotal(&next)?;
        self.lines = next;
        Ok(())
    }

    /// Remove a single line
    pub fn remove(&mut self, index: usize) -> CheckoutResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CheckoutError::NotFound(format!("cart line {}", index)));
        }
        Ok(self.lines.remove(index))
    }

    /// Remove every line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of unit price times quantity over all lines. Never exceeds
    /// [`MAX_SUBTOTAL_MINOR`] for a cart built through this API.
    pub fn subtotal_minor(&self) -> i64 {
        self.lines
            .iter()
            .map(CartLine::line_total_minor)
            .fold(0, i64::saturating_add)
    }

    /// Subtotal as money
    pub fn subtotal(&self) -> Money {
        Money::from_minor(self.subtotal_minor(), self.currency)
    }

    /// At least one line is sold through the commerce backend
    pub fn has_external_items(&self) -> bool {
        self.lines.iter().any(CartLine::is_external)
    }

    /// At least one line is a local demo product
    pub fn has_local_items(&self) -> bool {
        self.lines.iter().any(|l| !l.is_external())
    }

    /// Lines sold through the commerce backend
    pub fn external_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| l.is_external())
    }

    /// Local demo lines
    pub fn local_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| !l.is_external())
    }

    /// Classify the cart contents
    pub fn composition(&self) -> CartComposition {
        match (self.has_external_items(), self.has_local_items()) {
            (false, false) => CartComposition::Empty,
            (true, false) => CartComposition::ExternalOnly,
            (false, true) => CartComposition::LocalOnly,
            (true, true) => CartComposition::Mixed,
        }
    }

    /// Check if cart is empty
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .map(|l| l.quantity)
            .fold(0, u32::saturating_add)
    }
}

/// Subtotal of `lines`, or a validation error when it would overflow or
/// pass [`MAX_SUBTOTAL_MINOR`]
fn checked_subtotal(lines: &[CartLine]) -> CheckoutResult<i64> {
    lines
        .iter()
        .try_fold(0i64, |acc, line| {
            line.unit_price_minor
                .checked_mul(i64::from(line.quantity))
                .and_then(|total| acc.checked_add(total))
                .filter(|subtotal| *subtotal <= MAX_SUBTOTAL_MINOR)
        })
        .ok_or_else(|| {
            CheckoutError::Validation(format!(
                "cart total cannot exceed {}",
                format_minor(MAX_SUBTOTAL_MINOR)
            ))
        })
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(Currency::USD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serum() -> CartLine {
        CartLine::local("hyaluronic-acid-serum", "Hyaluronic Acid Serum", 799, 1).unwrap()
    }

    fn cleanser() -> CartLine {
        CartLine::external(
            "gid://shopify/Product/1",
            Some("gid://shopify/ProductVariant/11".to_string()),
            "Oat Cleanser",
            1000,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_line_validation() {
        assert!(CartLine::local("x", "X", 100, 0).is_err());
        assert!(CartLine::local("x", "X", -1, 1).is_err());
        assert!(CartLine::local("", "X", 100, 1).is_err());
        assert!(CartLine::local("x", "X", 0, 1).is_ok());
    }

    #[test]
    fn test_subtotal_and_counts() {
        let mut cart = Cart::new(Currency::USD);
        cart.add(serum()).unwrap();
        cart.add(cleanser()).unwrap();
        cart.set_quantity(0, 3).unwrap();

        assert_eq!(cart.subtotal_minor(), 3 * 799 + 1000);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal().display(), "$33.97");
    }

    #[test]
    fn test_add_merges_same_item() {
        let mut cart = Cart::default();
        cart.add(serum()).unwrap();
        let index = cart.add(serum()).unwrap();

        assert_eq!(index, 0);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_composition_flags() {
        let mut cart = Cart::default();
        assert_eq!(cart.composition(), CartComposition::Empty);

        cart.add(serum()).unwrap();
        assert!(cart.has_local_items());
        assert!(!cart.has_external_items());
        assert_eq!(cart.composition(), CartComposition::LocalOnly);

        cart.add(cleanser()).unwrap();
        assert_eq!(cart.composition(), CartComposition::Mixed);
        assert_eq!(cart.external_lines().count(), 1);
        assert_eq!(cart.local_lines().count(), 1);

        cart.remove(0).unwrap();
        assert_eq!(cart.composition(), CartComposition::ExternalOnly);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add(serum()).unwrap();
        cart.set_quantity(0, 0).unwrap();
        assert!(cart.is_empty());
        assert!(cart.set_quantity(0, 1).is_err());
    }

    #[test]
    fn test_variant_reference_fallback() {
        assert_eq!(cleanser().variant_reference(), "gid://shopify/ProductVariant/11");

        let no_variant =
            CartLine::external("gid://shopify/Product/2", None, "Toner", 500, 1).unwrap();
        assert_eq!(no_variant.variant_reference(), "gid://shopify/Product/2");
    }

    #[test]
    fn test_from_lines_rejects_bad_snapshot() {
        let mut bad = serum();
        bad.quantity = 0;
        assert!(Cart::from_lines(Currency::USD, vec![serum(), bad]).is_err());
    }

    #[test]
    fn test_oversized_price_rejected() {
        let result = CartLine::external(
            "gid://shopify/Product/9",
            None,
            "Gold Mask",
            20_000_000_000_000_000,
            1,
        );
        assert!(matches!(result, Err(CheckoutError::Validation(_))));

        let mut smuggled = cleanser();
        smuggled.unit_price_minor = 20_000_000_000_000_000;
        assert!(matches!(
            Cart::from_lines(Currency::USD, vec![smuggled]),
            Err(CheckoutError::Validation(_))
        ));

        assert!(CartLine::local("x", "X", MAX_UNIT_PRICE_MINOR, 1).is_ok());
        assert!(CartLine::local("x", "X", 100, MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_subtotal_limit_leaves_cart_unchanged() {
        let pricey = CartLine::local("x", "X", MAX_UNIT_PRICE_MINOR, 1).unwrap();

        assert!(Cart::from_lines(Currency::USD, vec![pricey.clone(), pricey.clone()]).is_err());

        let mut cart = Cart::default();
        cart.add(pricey.clone()).unwrap();
        assert!(matches!(
            cart.add(pricey),
            Err(CheckoutError::Validation(_))
        ));
        assert_eq!(cart.lines()[0].quantity, 1);

        assert!(cart.set_quantity(0, 2).is_err());
        assert_eq!(cart.subtotal_minor(), MAX_UNIT_PRICE_MINOR);

        cart.add(serum()).unwrap_err();
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_merge_respects_quantity_limit() {
        let mut cart = Cart::default();
        cart.add(CartLine::local("x", "X", 1, MAX_LINE_QUANTITY).unwrap())
            .unwrap();
        assert!(cart.add(CartLine::local("x", "X", 1, 1).unwrap()).is_err());
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }
}
