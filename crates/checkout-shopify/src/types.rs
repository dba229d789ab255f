//! Storefront API request and response shapes for `checkoutCreate`.

use checkout_core::{Currency, ExternalCheckoutRequest, ShippingAddress};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ShopifyError;

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Serialize)]
pub struct GraphQLRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Serialize)]
pub struct CheckoutCreateVariables {
    pub input: CheckoutCreateInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub line_items: Vec<CheckoutLineItemInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<MailingAddressInput>,
    pub allow_partial_addresses: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItemInput {
    pub variant_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<&ShippingAddress> for MailingAddressInput {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            address1: address.address1.clone(),
            city: address.city.clone(),
            province: address.province.clone(),
            zip: address.zip.clone(),
            country: address.country.clone(),
        }
    }
}

impl From<&ExternalCheckoutRequest> for CheckoutCreateInput {
    fn from(request: &ExternalCheckoutRequest) -> Self {
        Self {
            email: request.email.clone(),
            line_items: request
                .lines
                .iter()
                .map(|line| CheckoutLineItemInput {
                    variant_id: line.variant_reference.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            shipping_address: request.shipping_address.as_ref().map(Into::into),
            allow_partial_addresses: request.allow_partial_addresses,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphQLResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreateData {
    pub checkout_create: Option<CheckoutCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreatePayload {
    pub checkout: Option<Checkout>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
    #[serde(default)]
    pub checkout_user_errors: Vec<UserError>,
}

impl CheckoutCreatePayload {
    /// `userErrors` followed by `checkoutUserErrors`
    pub fn error_messages(&self) -> Vec<String> {
        self.user_errors
            .iter()
            .chain(self.checkout_user_errors.iter())
            .map(|e| e.message.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: String,
    pub web_url: String,
    pub total_price: MoneyV2,
    pub subtotal_price: MoneyV2,
    pub total_tax: MoneyV2,
}

/// Shopify money: a decimal string plus an ISO code
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    pub currency_code: String,
}

impl MoneyV2 {
    /// Amount in minor units, rounded to the nearest cent
    pub fn to_minor(&self) -> Result<i64, ShopifyError> {
        let amount = Decimal::from_str(self.amount.trim())
            .map_err(|_| ShopifyError::InvalidMoney(self.amount.clone()))?;
        (amount * Decimal::ONE_HUNDRED)
            .round_dp(0)
            .to_i64()
            .ok_or_else(|| ShopifyError::InvalidMoney(self.amount.clone()))
    }

    pub fn currency(&self) -> Result<Currency, ShopifyError> {
        Currency::from_code(&self.currency_code)
            .ok_or_else(|| ShopifyError::InvalidMoney(self.currency_code.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{PriceBreakdown, VariantLine};

    fn money(amount: &str) -> MoneyV2 {
        MoneyV2 {
            amount: amount.to_string(),
            currency_code: "USD".to_string(),
        }
    }

    #[test]
    fn test_money_to_minor() {
        assert_eq!(money("64.8").to_minor().unwrap(), 6_480);
        assert_eq!(money("5.99").to_minor().unwrap(), 599);
        assert_eq!(money("0.0").to_minor().unwrap(), 0);
        assert_eq!(money("12").to_minor().unwrap(), 1_200);
        assert!(money("twelve").to_minor().is_err());
        assert_eq!(money("1").currency().unwrap(), Currency::USD);
    }

    #[test]
    fn test_input_serializes_camel_case() {
        let request = ExternalCheckoutRequest {
            email: Some("a@example.com".to_string()),
            lines: vec![VariantLine {
                variant_reference: "gid://shopify/ProductVariant/1".to_string(),
                quantity: 2,
            }],
            shipping_address: Some(ShippingAddress {
                zip: Some("97201".to_string()),
                ..ShippingAddress::default()
            }),
            allow_partial_addresses: true,
            excluded_local_lines: 0,
            pricing: PriceBreakdown::for_subtotal(2_000),
        };

        let json = serde_json::to_value(CheckoutCreateInput::from(&request)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "email": "a@example.com",
                "lineItems": [{"variantId": "gid://shopify/ProductVariant/1", "quantity": 2}],
                "shippingAddress": {"zip": "97201"},
                "allowPartialAddresses": true
            })
        );
    }

    #[test]
    fn test_error_messages_merge_both_lists() {
        let payload: CheckoutCreatePayload = serde_json::from_value(serde_json::json!({
            "checkout": null,
            "userErrors": [{"field": ["input"], "message": "Input is invalid"}],
            "checkoutUserErrors": [
                {"field": ["input", "email"], "message": "Email is invalid", "code": "INVALID"}
            ]
        }))
        .unwrap();

        assert_eq!(
            payload.error_messages(),
            vec!["Input is invalid".to_string(), "Email is invalid".to_string()]
        );
    }
}
