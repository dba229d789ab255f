//! # Pricing
//!
//! Shipping, tax and total for a subtotal. Every payment path prices through
//! [`PriceBreakdown::for_subtotal`]; nothing else computes shipping or tax.

use crate::cart::Cart;
use crate::error::{CheckoutError, CheckoutResult};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Subtotals strictly above this ship free (50.00)
pub const FREE_SHIPPING_THRESHOLD_MINOR: i64 = 5_000;

/// Flat shipping fee below the threshold (5.99)
pub const FLAT_SHIPPING_MINOR: i64 = 599;

/// Sales tax rate in basis points (8%)
pub const TAX_RATE_BASIS_POINTS: i64 = 800;

/// Largest subtotal a cart may reach (999,999.99)
pub const MAX_SUBTOTAL_MINOR: i64 = 99_999_999;

/// Subtotal, shipping, tax and total in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
}

impl PriceBreakdown {
    /// Price a subtotal given in minor units.
    ///
    /// Carts keep their subtotal within [`MAX_SUBTOTAL_MINOR`]; values beyond
    /// `i64` range saturate instead of wrapping. Use
    /// [`PriceBreakdown::try_for_subtotal`] for untrusted input.
    pub fn for_subtotal(subtotal: i64) -> Self {
        let shipping = shipping_for(subtotal);
        let tax = tax_for(subtotal);
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal.saturating_add(shipping).saturating_add(tax),
        }
    }

    /// Price a subtotal that did not come from a [`Cart`]
    pub fn try_for_subtotal(subtotal: i64) -> CheckoutResult<Self> {
        if !(0..=MAX_SUBTOTAL_MINOR).contains(&subtotal) {
            return Err(CheckoutError::Validation(format!(
                "subtotal must be between 0 and {}",
                MAX_SUBTOTAL_MINOR
            )));
        }
        Ok(Self::for_subtotal(subtotal))
    }

    /// Price every line of a cart
    pub fn for_cart(cart: &Cart) -> Self {
        Self::for_subtotal(cart.subtotal_minor())
    }

    /// Whether the subtotal cleared the free-shipping threshold
    pub fn ships_free(&self) -> bool {
        self.shipping == 0
    }

    /// Attach a currency for display
    pub fn in_currency(&self, currency: Currency) -> PriceSummary {
        PriceSummary {
            subtotal: Money::from_minor(self.subtotal, currency),
            shipping: Money::from_minor(self.shipping, currency),
            tax: Money::from_minor(self.tax, currency),
            total: Money::from_minor(self.total, currency),
        }
    }
}

/// A breakdown with currency attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

fn shipping_for(subtotal: i64) -> i64 {
    if subtotal > FREE_SHIPPING_THRESHOLD_MINOR {
        0
    } else {
        FLAT_SHIPPING_MINOR
    }
}

/// Tax rounded half-up to the nearest minor unit
fn tax_for(subtotal: i64) -> i64 {
    subtotal
        .saturating_mul(TAX_RATE_BASIS_POINTS)
        .saturating_add(5_000)
        .div_euclid(10_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;

    #[test]
    fn test_free_shipping_above_threshold() {
        let price = PriceBreakdown::for_subtotal(6_000);
        assert_eq!(price.shipping, 0);
        assert_eq!(price.tax, 480);
        assert_eq!(price.total, 6_480);
        assert!(price.ships_free());
    }

    #[test]
    fn test_threshold_is_strict() {
        let at_threshold = PriceBreakdown::for_subtotal(5_000);
        assert_eq!(at_threshold.shipping, 599);
        assert_eq!(at_threshold.tax, 400);
        assert_eq!(at_threshold.total, 5_999);

        assert_eq!(PriceBreakdown::for_subtotal(5_001).shipping, 0);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10.99 * 0.08 = 0.8792
        assert_eq!(PriceBreakdown::for_subtotal(1_099).tax, 88);
        assert_eq!(PriceBreakdown::for_subtotal(1_000).tax, 80);
        // 10.10 * 0.08 = 0.808
        assert_eq!(PriceBreakdown::for_subtotal(1_010).tax, 81);
        assert_eq!(PriceBreakdown::for_subtotal(6).tax, 0);
        assert_eq!(PriceBreakdown::for_subtotal(7).tax, 1);
        assert_eq!(PriceBreakdown::for_subtotal(0).tax, 0);
    }

    #[test]
    fn test_for_cart() {
        let cart = Cart::from_lines(
            Currency::USD,
            vec![CartLine::local("niacinamide", "Niacinamide", 500, 2).unwrap()],
        )
        .unwrap();

        let price = PriceBreakdown::for_cart(&cart);
        assert_eq!(price.subtotal, 1_000);
        assert_eq!(price.shipping, 599);
        assert_eq!(price.tax, 80);
        assert_eq!(price.total, 1_679);
        assert_eq!(price.in_currency(Currency::USD).total.display(), "$16.79");
    }

    #[test]
    fn test_out_of_range_subtotal_rejected() {
        assert!(matches!(
            PriceBreakdown::try_for_subtotal(i64::MAX),
            Err(CheckoutError::Validation(_))
        ));
        assert!(PriceBreakdown::try_for_subtotal(-1).is_err());
        assert_eq!(
            PriceBreakdown::try_for_subtotal(MAX_SUBTOTAL_MINOR).unwrap(),
            PriceBreakdown::for_subtotal(MAX_SUBTOTAL_MINOR)
        );

        // never wraps, even off the checked path
        let huge = PriceBreakdown::for_subtotal(i64::MAX);
        assert_eq!(huge.total, i64::MAX);
        assert!(huge.tax > 0);
    }
}
