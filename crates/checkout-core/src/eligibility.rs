//! # Payment Path Eligibility
//!
//! Decides which payment paths a cart may use and which one is selected by
//! default. Pure functions of the cart and the static capability flags;
//! evaluated fresh for every checkout view and every submission.
//!
//! | Path                | Eligible when                                  |
//! |---------------------|------------------------------------------------|
//! | `ExternalCommerce`  | cart has at least one external line            |
//! | `CardProcessor`     | card processor is configured                   |
//! | `LocalDemo`         | no external lines and at least one local line  |

use crate::cart::Cart;
use crate::error::{CheckoutError, CheckoutResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the three payment paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentPath {
    /// Hosted checkout at the commerce backend (Shopify)
    #[serde(rename = "shopify")]
    ExternalCommerce,
    /// Card payment through the processor (Stripe)
    #[serde(rename = "stripe")]
    CardProcessor,
    /// Simulated checkout for demo products
    #[serde(rename = "mock")]
    LocalDemo,
}

impl PaymentPath {
    /// Display order for the checkout view
    pub const ALL: [PaymentPath; 3] = [
        PaymentPath::ExternalCommerce,
        PaymentPath::CardProcessor,
        PaymentPath::LocalDemo,
    ];

    /// Auto-selection priority, first eligible wins
    pub const PRIORITY: [PaymentPath; 3] = [
        PaymentPath::CardProcessor,
        PaymentPath::ExternalCommerce,
        PaymentPath::LocalDemo,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPath::ExternalCommerce => "shopify",
            PaymentPath::CardProcessor => "stripe",
            PaymentPath::LocalDemo => "mock",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentPath::ExternalCommerce => "Shopify Checkout",
            PaymentPath::CardProcessor => "Credit Card",
            PaymentPath::LocalDemo => "Demo Checkout",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PaymentPath::ExternalCommerce => {
                "Secure checkout powered by Shopify (Shopify products only)"
            }
            PaymentPath::CardProcessor => "Pay securely with your credit or debit card",
            PaymentPath::LocalDemo => "Demo checkout for testing purposes",
        }
    }
}

impl std::fmt::Display for PaymentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentPath {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shopify" => Ok(PaymentPath::ExternalCommerce),
            "stripe" => Ok(PaymentPath::CardProcessor),
            "mock" => Ok(PaymentPath::LocalDemo),
            other => Err(CheckoutError::Validation(format!(
                "unknown payment method: {}",
                other
            ))),
        }
    }
}

/// Static capability flags supplied by the environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Card processor keys are present and the processor is enabled
    pub card_processor_configured: bool,
}

impl Capabilities {
    pub fn new(card_processor_configured: bool) -> Self {
        Self {
            card_processor_configured,
        }
    }
}

/// A payment path with its derived eligibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentPathOption {
    #[serde(rename = "id")]
    pub path: PaymentPath,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "available")]
    pub is_eligible: bool,
}

/// How the checkout view should present the path choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathSelection {
    /// Nothing eligible; checkout cannot proceed
    Unavailable,
    /// Exactly one eligible path; the shopper cannot change it
    Forced { path: PaymentPath },
    /// Several eligible paths; `default` is preselected
    Selectable {
        default: PaymentPath,
        eligible: Vec<PaymentPath>,
    },
}

/// Eligibility of every path for one cart snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    options: Vec<PaymentPathOption>,
}

/// Resolve path eligibility for a cart
pub fn resolve(cart: &Cart, capabilities: Capabilities) -> Eligibility {
    let has_external = cart.has_external_items();
    let has_local = cart.has_local_items();

    let options = PaymentPath::ALL
        .iter()
        .map(|&path| {
            let is_eligible = match path {
                PaymentPath::ExternalCommerce => has_external,
                PaymentPath::CardProcessor => capabilities.card_processor_configured,
                PaymentPath::LocalDemo => !has_external && has_local,
            };
            PaymentPathOption {
                path,
                name: path.display_name(),
                description: path.description(),
                is_eligible,
            }
        })
        .collect();

    Eligibility { options }
}

impl Eligibility {
    /// All options in display order
    pub fn options(&self) -> &[PaymentPathOption] {
        &self.options
    }

    pub fn is_eligible(&self, path: PaymentPath) -> bool {
        self.options
            .iter()
            .any(|o| o.path == path && o.is_eligible)
    }

    /// Eligible paths in display order
    pub fn eligible_paths(&self) -> Vec<PaymentPath> {
        self.options
            .iter()
            .filter(|o| o.is_eligible)
            .map(|o| o.path)
            .collect()
    }

    /// First eligible path by priority
    pub fn default_path(&self) -> Option<PaymentPath> {
        PaymentPath::PRIORITY
            .iter()
            .copied()
            .find(|&p| self.is_eligible(p))
    }

    pub fn can_checkout(&self) -> bool {
        self.default_path().is_some()
    }

    pub fn selection(&self) -> PathSelection {
        let eligible = self.eligible_paths();
        match (eligible.len(), self.default_path()) {
            (0, _) | (_, None) => PathSelection::Unavailable,
            (1, Some(path)) => PathSelection::Forced { path },
            (_, Some(default)) => PathSelection::Selectable { default, eligible },
        }
    }

    /// Settle on the path to submit. `None` takes the default; an explicit
    /// request must name an eligible path. With a single eligible path the
    /// only acceptable request is that path.
    pub fn select(&self, requested: Option<PaymentPath>) -> CheckoutResult<PaymentPath> {
        match requested {
            None => self.default_path().ok_or(CheckoutError::NoEligiblePath),
            Some(path) if self.is_eligible(path) => Ok(path),
            Some(path) => {
                if self.can_checkout() {
                    Err(CheckoutError::NotEligible { path })
                } else {
                    Err(CheckoutError::NoEligiblePath)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::money::Currency;

    fn external(price: i64) -> CartLine {
        CartLine::external("gid://shopify/Product/1", None, "Cleanser", price, 1).unwrap()
    }

    fn local(price: i64, qty: u32) -> CartLine {
        CartLine::local("retinol-eye-cream", "Retinol Eye Cream", price, qty).unwrap()
    }

    fn cart(lines: Vec<CartLine>) -> Cart {
        Cart::from_lines(Currency::USD, lines).unwrap()
    }

    #[test]
    fn test_external_cart_with_card_defaults_to_card() {
        let eligibility = resolve(&cart(vec![external(1_000)]), Capabilities::new(true));

        assert_eq!(
            eligibility.eligible_paths(),
            vec![PaymentPath::ExternalCommerce, PaymentPath::CardProcessor]
        );
        assert_eq!(eligibility.default_path(), Some(PaymentPath::CardProcessor));
        assert!(matches!(
            eligibility.selection(),
            PathSelection::Selectable {
                default: PaymentPath::CardProcessor,
                ..
            }
        ));
        assert_eq!(
            eligibility.select(Some(PaymentPath::ExternalCommerce)).unwrap(),
            PaymentPath::ExternalCommerce
        );
    }

    #[test]
    fn test_local_only_without_card_is_forced_demo() {
        let eligibility = resolve(&cart(vec![local(500, 2)]), Capabilities::new(false));

        assert_eq!(eligibility.eligible_paths(), vec![PaymentPath::LocalDemo]);
        assert_eq!(
            eligibility.selection(),
            PathSelection::Forced {
                path: PaymentPath::LocalDemo
            }
        );
        assert!(matches!(
            eligibility.select(Some(PaymentPath::CardProcessor)),
            Err(CheckoutError::NotEligible {
                path: PaymentPath::CardProcessor
            })
        ));
        assert_eq!(eligibility.select(None).unwrap(), PaymentPath::LocalDemo);
    }

    #[test]
    fn test_mixed_cart_excludes_demo() {
        let eligibility = resolve(
            &cart(vec![external(1_000), local(500, 1)]),
            Capabilities::new(false),
        );

        assert!(eligibility.is_eligible(PaymentPath::ExternalCommerce));
        assert!(!eligibility.is_eligible(PaymentPath::LocalDemo));
        assert_eq!(
            eligibility.selection(),
            PathSelection::Forced {
                path: PaymentPath::ExternalCommerce
            }
        );
    }

    #[test]
    fn test_card_eligibility_tracks_capability_only() {
        let carts = [
            cart(vec![]),
            cart(vec![external(100)]),
            cart(vec![local(100, 1)]),
            cart(vec![external(100), local(100, 1)]),
        ];

        for c in &carts {
            for configured in [true, false] {
                let eligibility = resolve(c, Capabilities::new(configured));
                assert_eq!(
                    eligibility.is_eligible(PaymentPath::CardProcessor),
                    configured
                );
            }
        }
    }

    #[test]
    fn test_empty_cart_without_card_cannot_checkout() {
        let eligibility = resolve(&cart(vec![]), Capabilities::default());

        assert!(!eligibility.can_checkout());
        assert_eq!(eligibility.selection(), PathSelection::Unavailable);
        assert!(matches!(
            eligibility.select(None),
            Err(CheckoutError::NoEligiblePath)
        ));
        assert!(matches!(
            eligibility.select(Some(PaymentPath::LocalDemo)),
            Err(CheckoutError::NoEligiblePath)
        ));
    }

    #[test]
    fn test_path_wire_names() {
        assert_eq!("stripe".parse::<PaymentPath>().unwrap(), PaymentPath::CardProcessor);
        assert!("paypal".parse::<PaymentPath>().is_err());
        assert_eq!(
            serde_json::to_string(&PaymentPath::LocalDemo).unwrap(),
            "\"mock\""
        );
    }
}
