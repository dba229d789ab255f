//! # Checkout Payload Builders
//!
//! One pure builder per payment path, turning a cart snapshot into the
//! request its backend expects. Builders never touch the network, never
//! mutate the cart, and return identical output for identical input.
//!
//! All three price through [`PriceBreakdown::for_subtotal`] over the lines
//! they actually submit.

use crate::cart::{Cart, CartLine};
use crate::eligibility::PaymentPath;
use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{format_minor, Currency};
use crate::pricing::PriceBreakdown;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value written to the `source` metadata key on processor requests
pub const METADATA_SOURCE: &str = "glow-storefront";

/// Shipping address as collected by the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// What the shopper told us at checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopperDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

impl ShopperDetails {
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_shipping_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = Some(address);
        self
    }

    /// Email with surrounding whitespace removed; blank counts as absent
    fn email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(String::from)
    }
}

// =============================================================================
// External commerce (Shopify)
// =============================================================================

/// A variant and how many of it to buy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLine {
    pub variant_reference: String,
    pub quantity: u32,
}

/// Request for the commerce backend's hosted checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalCheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub lines: Vec<VariantLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    pub allow_partial_addresses: bool,
    /// Local lines left out of this request (still shown to the shopper)
    pub excluded_local_lines: usize,
    /// Our estimate over the submitted lines; the backend computes its own
    pub pricing: PriceBreakdown,
}

/// Build the commerce backend request from the external lines of a cart
pub fn build_external_checkout(
    cart: &Cart,
    shopper: &ShopperDetails,
) -> CheckoutResult<ExternalCheckoutRequest> {
    ensure_not_empty(cart)?;

    let lines: Vec<VariantLine> = cart
        .external_lines()
        .map(|line| VariantLine {
            variant_reference: line.variant_reference().to_string(),
            quantity: line.quantity,
        })
        .collect();

    if lines.is_empty() {
        return Err(CheckoutError::Validation(
            "no store products in cart; this checkout only supports store products".to_string(),
        ));
    }

    let subtotal = cart.external_lines().map(CartLine::line_total_minor).sum();

    Ok(ExternalCheckoutRequest {
        email: shopper.email(),
        lines,
        shipping_address: shopper.shipping_address.clone(),
        allow_partial_addresses: true,
        excluded_local_lines: cart.local_lines().count(),
        pricing: PriceBreakdown::for_subtotal(subtotal),
    })
}

// =============================================================================
// Card processor (Stripe)
// =============================================================================

/// How the card payment is collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CardFlow {
    /// Redirect to the processor's hosted page
    HostedSession {
        success_url: String,
        cancel_url: String,
    },
    /// Embedded payment form confirmed client-side with a client secret
    Embedded,
}

/// A processor line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardLineItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price in minor units
    pub unit_amount: i64,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CardLineItem {
    fn synthetic(name: &str, description: &str, amount: i64) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            unit_amount: amount,
            quantity: 1,
            image_url: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> i64 {
        self.unit_amount * i64::from(self.quantity)
    }
}

/// Request for the card processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardCheckoutRequest {
    pub currency: Currency,
    /// Cart lines followed by shipping and tax lines
    pub line_items: Vec<CardLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub flow: CardFlow,
    pub pricing: PriceBreakdown,
    pub metadata: BTreeMap<String, String>,
}

impl CardCheckoutRequest {
    /// What the processor will charge: the sum of every line item
    pub fn charged_total(&self) -> i64 {
        self.line_items.iter().map(CardLineItem::total).sum()
    }
}

/// Build the card processor request from every line of the cart
pub fn build_card_checkout(
    cart: &Cart,
    shopper: &ShopperDetails,
    flow: CardFlow,
) -> CheckoutResult<CardCheckoutRequest> {
    ensure_not_empty(cart)?;

    let pricing = PriceBreakdown::for_cart(cart);
    let customer_email = shopper.email();

    let mut line_items: Vec<CardLineItem> = cart
        .lines()
        .iter()
        .map(|line| {
            let mut metadata = BTreeMap::new();
            metadata.insert("productId".to_string(), line.item_id.clone());
            metadata.insert(
                "isShopifyProduct".to_string(),
                line.is_external().to_string(),
            );
            CardLineItem {
                name: line.display_name.clone(),
                description: None,
                unit_amount: line.unit_price_minor,
                quantity: line.quantity,
                image_url: Some(line.image_url.clone()).filter(|url| !url.is_empty()),
                metadata,
            }
        })
        .collect();

    if pricing.shipping > 0 {
        line_items.push(CardLineItem::synthetic(
            "Shipping",
            "Standard shipping",
            pricing.shipping,
        ));
    }
    if pricing.tax > 0 {
        line_items.push(CardLineItem::synthetic("Tax", "Sales tax", pricing.tax));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), METADATA_SOURCE.to_string());
    metadata.insert("itemCount".to_string(), cart.len().to_string());
    metadata.insert(
        "hasShopifyItems".to_string(),
        cart.has_external_items().to_string(),
    );
    metadata.insert("hasMockItems".to_string(), cart.has_local_items().to_string());
    if flow == CardFlow::Embedded {
        metadata.insert("subtotal".to_string(), format_minor(pricing.subtotal));
        metadata.insert("shipping".to_string(), format_minor(pricing.shipping));
        metadata.insert("tax".to_string(), format_minor(pricing.tax));
        metadata.insert(
            "customerEmail".to_string(),
            customer_email.clone().unwrap_or_default(),
        );
    }

    Ok(CardCheckoutRequest {
        currency: cart.currency(),
        line_items,
        customer_email,
        flow,
        pricing,
        metadata,
    })
}

// =============================================================================
// Local demo
// =============================================================================

/// Simulated confirmation for a demo-only cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfirmation {
    pub line_count: usize,
    pub item_count: u32,
    pub pricing: PriceBreakdown,
    pub message: String,
}

/// Build the demo confirmation. Must never run on a cart with external lines.
pub fn build_demo_checkout(cart: &Cart) -> CheckoutResult<DemoConfirmation> {
    ensure_not_empty(cart)?;

    if cart.has_external_items() {
        return Err(CheckoutError::Precondition(
            "demo checkout attempted on a cart containing store products".to_string(),
        ));
    }

    Ok(DemoConfirmation {
        line_count: cart.len(),
        item_count: cart.item_count(),
        pricing: PriceBreakdown::for_cart(cart),
        message: "Demo order placed successfully! (This contains only demo products)"
            .to_string(),
    })
}

// =============================================================================
// Dispatch by path
// =============================================================================

/// A built request, ready for its backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", content = "request")]
pub enum CheckoutPayload {
    #[serde(rename = "shopify")]
    External(ExternalCheckoutRequest),
    #[serde(rename = "stripe")]
    Card(CardCheckoutRequest),
    #[serde(rename = "mock")]
    Demo(DemoConfirmation),
}

impl CheckoutPayload {
    pub fn path(&self) -> PaymentPath {
        match self {
            CheckoutPayload::External(_) => PaymentPath::ExternalCommerce,
            CheckoutPayload::Card(_) => PaymentPath::CardProcessor,
            CheckoutPayload::Demo(_) => PaymentPath::LocalDemo,
        }
    }

    pub fn pricing(&self) -> PriceBreakdown {
        match self {
            CheckoutPayload::External(r) => r.pricing,
            CheckoutPayload::Card(r) => r.pricing,
            CheckoutPayload::Demo(c) => c.pricing,
        }
    }
}

/// Run the builder for `path`
pub fn build_payload(
    path: PaymentPath,
    cart: &Cart,
    shopper: &ShopperDetails,
    card_flow: CardFlow,
) -> CheckoutResult<CheckoutPayload> {
    match path {
        PaymentPath::ExternalCommerce => {
            build_external_checkout(cart, shopper).map(CheckoutPayload::External)
        }
        PaymentPath::CardProcessor => {
            build_card_checkout(cart, shopper, card_flow).map(CheckoutPayload::Card)
        }
        PaymentPath::LocalDemo => build_demo_checkout(cart).map(CheckoutPayload::Demo),
    }
}

fn ensure_not_empty(cart: &Cart) -> CheckoutResult<()> {
    if cart.is_empty() {
        return Err(CheckoutError::Validation("cart is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn external(id: &str, price: i64, qty: u32) -> CartLine {
        CartLine::external(
            format!("gid://shopify/Product/{}", id),
            Some(format!("gid://shopify/ProductVariant/{}", id)),
            format!("Product {}", id),
            price,
            qty,
        )
        .unwrap()
    }

    fn local(id: &str, price: i64, qty: u32) -> CartLine {
        CartLine::local(id, id, price, qty).unwrap()
    }

    fn cart(lines: Vec<CartLine>) -> Cart {
        Cart::from_lines(Currency::USD, lines).unwrap()
    }

    fn hosted() -> CardFlow {
        CardFlow::HostedSession {
            success_url: "https://shop.test/checkout/success".to_string(),
            cancel_url: "https://shop.test/checkout".to_string(),
        }
    }

    fn shopper() -> ShopperDetails {
        ShopperDetails::default()
            .with_email(" shopper@example.com ")
            .with_shipping_address(ShippingAddress {
                city: Some("Portland".to_string()),
                zip: Some("97201".to_string()),
                ..ShippingAddress::default()
            })
    }

    #[test]
    fn test_external_keeps_only_external_lines() {
        let mixed = cart(vec![external("1", 1_000, 1), local("niacinamide", 599, 1)]);
        let request = build_external_checkout(&mixed, &shopper()).unwrap();

        assert_eq!(
            request.lines,
            vec![VariantLine {
                variant_reference: "gid://shopify/ProductVariant/1".to_string(),
                quantity: 1,
            }]
        );
        assert_eq!(request.excluded_local_lines, 1);
        assert_eq!(request.email.as_deref(), Some("shopper@example.com"));
        assert!(request.allow_partial_addresses);
        assert_eq!(request.pricing, PriceBreakdown::for_subtotal(1_000));
    }

    #[test]
    fn test_external_without_external_lines_is_validation_error() {
        let demo_only = cart(vec![local("niacinamide", 599, 1)]);
        let err = build_external_checkout(&demo_only, &shopper()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_card_includes_every_line_plus_shipping_and_tax() {
        let mixed = cart(vec![external("1", 1_000, 2), local("niacinamide", 599, 1)]);
        let request = build_card_checkout(&mixed, &shopper(), hosted()).unwrap();

        // 2 products + shipping + tax
        assert_eq!(request.line_items.len(), 4);
        assert_eq!(request.line_items[2].name, "Shipping");
        assert_eq!(request.line_items[2].unit_amount, 599);
        assert_eq!(request.line_items[3].name, "Tax");
        assert_eq!(request.line_items[3].unit_amount, 208);
        assert_eq!(request.charged_total(), request.pricing.total);
        assert_eq!(
            request.line_items[0].metadata.get("isShopifyProduct"),
            Some(&"true".to_string())
        );
        assert_eq!(request.metadata.get("hasMockItems"), Some(&"true".to_string()));
        assert!(!request.metadata.contains_key("subtotal"));
    }

    #[test]
    fn test_card_free_shipping_omits_shipping_line() {
        let big = cart(vec![external("1", 3_000, 2)]);
        let request = build_card_checkout(&big, &ShopperDetails::default(), hosted()).unwrap();

        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[1].name, "Tax");
        assert_eq!(request.line_items[1].unit_amount, 480);
        assert_eq!(request.charged_total(), 6_480);
        assert_eq!(request.customer_email, None);
    }

    #[test]
    fn test_embedded_card_carries_price_metadata() {
        let c = cart(vec![local("niacinamide", 599, 1)]);
        let request = build_card_checkout(&c, &shopper(), CardFlow::Embedded).unwrap();

        assert_eq!(request.metadata.get("subtotal"), Some(&"5.99".to_string()));
        assert_eq!(request.metadata.get("shipping"), Some(&"5.99".to_string()));
        assert_eq!(request.metadata.get("tax"), Some(&"0.48".to_string()));
        assert_eq!(
            request.metadata.get("customerEmail"),
            Some(&"shopper@example.com".to_string())
        );
    }

    #[test]
    fn test_demo_refuses_external_lines() {
        let mixed = cart(vec![external("1", 1_000, 1), local("niacinamide", 599, 1)]);
        let err = build_demo_checkout(&mixed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let demo_only = cart(vec![local("niacinamide", 500, 2)]);
        let confirmation = build_demo_checkout(&demo_only).unwrap();
        assert_eq!(confirmation.item_count, 2);
        assert_eq!(confirmation.pricing.total, 1_679);
    }

    #[test]
    fn test_empty_cart_fails_every_builder() {
        let empty = cart(vec![]);
        for path in PaymentPath::ALL {
            let err = build_payload(path, &empty, &shopper(), hosted()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "path {}", path);
        }
    }

    #[test]
    fn test_pricing_identical_across_builders() {
        let demo_only = cart(vec![local("serum", 2_500, 1), local("toner", 3_500, 1)]);
        let as_external = cart(vec![external("1", 2_500, 1), external("2", 3_500, 1)]);

        let demo = build_demo_checkout(&demo_only).unwrap().pricing;
        let card = build_card_checkout(&demo_only, &shopper(), hosted())
            .unwrap()
            .pricing;
        let ext = build_external_checkout(&as_external, &shopper())
            .unwrap()
            .pricing;

        assert_eq!(demo, card);
        assert_eq!(card, ext);
        assert_eq!(demo.total, 6_480);
    }

    #[test]
    fn test_builders_are_deterministic() {
        let mixed = cart(vec![external("1", 1_000, 1), local("niacinamide", 599, 3)]);
        let demo_only = cart(vec![local("niacinamide", 599, 3), local("retinol", 1_250, 1)]);
        let cases = [
            (PaymentPath::ExternalCommerce, &mixed),
            (PaymentPath::CardProcessor, &mixed),
            (PaymentPath::LocalDemo, &demo_only),
        ];

        for (path, c) in cases {
            let first = build_payload(path, c, &shopper(), CardFlow::Embedded).unwrap();
            let second = build_payload(path, c, &shopper(), CardFlow::Embedded).unwrap();
            assert_eq!(
                serde_json::to_vec(&first).unwrap(),
                serde_json::to_vec(&second).unwrap()
            );
        }
    }
}
