//! GraphQL documents sent to the Storefront API.

/// Create a hosted checkout from variant lines
pub const CREATE_CHECKOUT_MUTATION: &str = r#"
mutation checkoutCreate($input: CheckoutCreateInput!) {
  checkoutCreate(input: $input) {
    checkout {
      id
      webUrl
      totalPrice {
        amount
        currencyCode
      }
      subtotalPrice {
        amount
        currencyCode
      }
      totalTax {
        amount
        currencyCode
      }
    }
    userErrors {
      field
      message
    }
    checkoutUserErrors {
      field
      message
      code
    }
  }
}
"#;
