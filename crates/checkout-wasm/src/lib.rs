//! # checkout-wasm
//!
//! WebAssembly bindings for glow-checkout-rs.
//!
//! The browser runs the same eligibility resolver and price arithmetic as
//! the server, so the checkout page never disagrees with what gets charged.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { resolve_payment_paths, price_breakdown } from 'glow-checkout-wasm';
//!
//! await init();
//!
//! const view = resolve_payment_paths(cart.items, stripeEnabled);
//! const pricing = price_breakdown(cart.items);
//! console.log(format_price(pricing.total, 'usd'));
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::{
    resolve, Capabilities, Cart, CartComposition, CartLine, CheckoutResult, Currency, Money,
    PathSelection, PaymentPathOption, PriceBreakdown,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Payment options for a cart, as the checkout page renders them
#[derive(Debug, Serialize)]
pub struct PaymentPaths {
    pub options: Vec<PaymentPathOption>,
    pub selection: PathSelection,
    pub can_checkout: bool,
    pub composition: CartComposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

fn cart_from_lines(lines: Vec<CartLine>) -> CheckoutResult<Cart> {
    Cart::from_lines(Currency::default(), lines)
}

fn payment_paths(cart: &Cart, card_processor_configured: bool) -> PaymentPaths {
    let eligibility = resolve(cart, Capabilities::new(card_processor_configured));
    let composition = cart.composition();
    let selection = if cart.is_empty() {
        PathSelection::Unavailable
    } else {
        eligibility.selection()
    };
    PaymentPaths {
        options: eligibility.options().to_vec(),
        selection,
        can_checkout: eligibility.can_checkout() && !cart.is_empty(),
        composition,
        notice: composition.notice(),
    }
}

fn is_valid_item_id(item_id: &str) -> bool {
    !item_id.is_empty()
        && item_id.len() <= 200
        && item_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '/' | '.'))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn lines_from_js(items: JsValue) -> Result<Vec<CartLine>, JsValue> {
    serde_wasm_bindgen::from_value(items)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart items: {}", e)))
}

/// Eligible payment paths and the default selection for a list of cart lines
#[wasm_bindgen]
pub fn resolve_payment_paths(items: JsValue, card_processor_configured: bool) -> Result<JsValue, JsValue> {
    let cart = cart_from_lines(lines_from_js(items)?)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&payment_paths(&cart, card_processor_configured))
}

/// Subtotal, shipping, tax and total for a list of cart lines
#[wasm_bindgen]
pub fn price_breakdown(items: JsValue) -> Result<JsValue, JsValue> {
    let cart = cart_from_lines(lines_from_js(items)?)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&PriceBreakdown::for_cart(&cart))
}

/// Same as [`price_breakdown`] but from a subtotal in minor units
#[wasm_bindgen]
pub fn price_breakdown_for_subtotal(subtotal_minor: i64) -> Result<JsValue, JsValue> {
    let pricing = PriceBreakdown::try_for_subtotal(subtotal_minor)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&pricing)
}

/// Format minor units for display ("$64.80"). Unknown currency codes fall
/// back to the storefront currency.
#[wasm_bindgen]
pub fn format_price(amount_minor: i64, currency: &str) -> String {
    let currency = Currency::from_code(currency).unwrap_or_default();
    Money::from_minor(amount_minor, currency).display()
}

/// Validate an item id (local catalog slug or commerce backend GID)
#[wasm_bindgen]
pub fn validate_item_id(item_id: &str) -> bool {
    is_valid_item_id(item_id)
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::PaymentPath;

    fn lines() -> Vec<CartLine> {
        vec![
            CartLine::external(
                "gid://shopify/Product/1",
                Some("gid://shopify/ProductVariant/1".to_string()),
                "Rose Toner",
                1_500,
                1,
            )
            .unwrap(),
            CartLine::local("niacinamide", "Niacinamide 10% + Zinc 1%", 799, 2).unwrap(),
        ]
    }

    #[test]
    fn test_payment_paths_match_server() {
        let cart = cart_from_lines(lines()).unwrap();

        let paths = payment_paths(&cart, false);
        assert_eq!(
            paths.selection,
            PathSelection::Forced {
                path: PaymentPath::ExternalCommerce
            }
        );
        assert_eq!(paths.composition, CartComposition::Mixed);
        assert!(paths.notice.is_some());

        let paths = payment_paths(&cart, true);
        assert!(matches!(
            paths.selection,
            PathSelection::Selectable {
                default: PaymentPath::CardProcessor,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_cart_cannot_checkout() {
        let cart = cart_from_lines(Vec::new()).unwrap();
        let paths = payment_paths(&cart, true);
        assert!(!paths.can_checkout);
        assert_eq!(paths.selection, PathSelection::Unavailable);
    }

    #[test]
    fn test_oversized_line_rejected() {
        let mut line = lines().remove(0);
        line.unit_price_minor = 20_000_000_000_000_000;
        assert!(cart_from_lines(vec![line]).is_err());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1999, "usd"), "$19.99");
        assert_eq!(format_price(100, "USD"), "$1.00");
        assert_eq!(format_price(799, "gbp"), "£7.99");
    }

    #[test]
    fn test_validate_item_id() {
        assert!(validate_item_id("niacinamide"));
        assert!(validate_item_id("gid://shopify/Product/7982853619874"));
        assert!(!validate_item_id(""));
        assert!(!validate_item_id("invalid id"));
        assert!(!validate_item_id("<script>"));
    }
}
