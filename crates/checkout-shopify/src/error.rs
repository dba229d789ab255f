//! Errors from the Storefront API and how they map onto checkout errors.

use checkout_core::CheckoutError;
use thiserror::Error;

pub(crate) const PROVIDER: &str = "shopify";

/// Errors that can occur when talking to the Storefront API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request did not finish in time.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// GraphQL query returned top-level errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// `checkoutCreate` returned user errors.
    #[error("Checkout errors: {}", .0.join("; "))]
    UserErrors(Vec<String>),

    /// Non-success status without a GraphQL error body.
    #[error("HTTP status {0}")]
    Status(u16),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response had neither a checkout nor errors.
    #[error("Response did not include a checkout")]
    MissingCheckout,

    /// A money field could not be read.
    #[error("Invalid money value: {0}")]
    InvalidMoney(String),
}

impl From<ShopifyError> for CheckoutError {
    fn from(err: ShopifyError) -> Self {
        match err {
            ShopifyError::GraphQL(messages) | ShopifyError::UserErrors(messages) => {
                CheckoutError::BackendRejection {
                    provider: PROVIDER.to_string(),
                    messages,
                }
            }
            ShopifyError::Timeout(seconds) => CheckoutError::Timeout {
                provider: PROVIDER.to_string(),
                seconds,
            },
            ShopifyError::Http(e) => CheckoutError::Transport(e.to_string()),
            other => CheckoutError::UnexpectedResponse {
                provider: PROVIDER.to_string(),
                message: other.to_string(),
            },
        }
    }
}
