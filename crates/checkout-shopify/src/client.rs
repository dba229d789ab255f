//! # Storefront Checkout Client
//!
//! Implements [`CommerceBackend`] with the Storefront API `checkoutCreate`
//! mutation.

use crate::config::ShopifyConfig;
use crate::error::{ShopifyError, PROVIDER};
use crate::queries::CREATE_CHECKOUT_MUTATION;
use crate::types::{
    CheckoutCreateData, CheckoutCreateInput, CheckoutCreateVariables, GraphQLRequest,
    GraphQLResponse,
};
use async_trait::async_trait;
use checkout_core::{
    CheckoutError, CheckoutResult, CommerceBackend, ExternalCheckout, ExternalCheckoutRequest,
};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Shopify Storefront API client
pub struct ShopifyStorefront {
    config: ShopifyConfig,
    client: reqwest::Client,
    timeout: Duration,
}

impl ShopifyStorefront {
    pub fn new(config: ShopifyConfig) -> CheckoutResult<Self> {
        Self::with_timeout(config, Duration::from_secs(30))
    }

    pub fn with_timeout(config: ShopifyConfig, timeout: Duration) -> CheckoutResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            timeout,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(ShopifyConfig::from_env()?)
    }

    /// Run `checkoutCreate` and return the created checkout
    async fn checkout_create(
        &self,
        input: CheckoutCreateInput,
    ) -> Result<ExternalCheckout, ShopifyError> {
        let body = GraphQLRequest {
            query: CREATE_CHECKOUT_MUTATION,
            variables: CheckoutCreateVariables { input },
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .header(
                "X-Shopify-Storefront-Access-Token",
                &self.config.storefront_access_token,
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await.map_err(|e| self.http_error(e))?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            // Shopify sends GraphQL-shaped errors on 4xx when it can
            if let Ok(parsed) =
                serde_json::from_str::<GraphQLResponse<serde_json::Value>>(&response_text)
            {
                if !parsed.errors.is_empty() {
                    return Err(ShopifyError::GraphQL(
                        parsed.errors.into_iter().map(|e| e.message).collect(),
                    ));
                }
            }
            return Err(ShopifyError::Status(status.as_u16()));
        }

        let parsed: GraphQLResponse<CheckoutCreateData> = serde_json::from_str(&response_text)?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            warn!(?messages, "Shopify GraphQL errors");
            return Err(ShopifyError::GraphQL(messages));
        }

        let payload = parsed
            .data
            .and_then(|d| d.checkout_create)
            .ok_or(ShopifyError::MissingCheckout)?;

        let messages = payload.error_messages();
        if !messages.is_empty() {
            warn!(?messages, "Shopify checkout errors");
            return Err(ShopifyError::UserErrors(messages));
        }

        let checkout = payload.checkout.ok_or(ShopifyError::MissingCheckout)?;

        Ok(ExternalCheckout {
            total_minor: checkout.total_price.to_minor()?,
            subtotal_minor: checkout.subtotal_price.to_minor()?,
            tax_minor: checkout.total_tax.to_minor()?,
            currency: checkout.total_price.currency()?,
            checkout_id: checkout.id,
            web_url: checkout.web_url,
        })
    }

    fn http_error(&self, err: reqwest::Error) -> ShopifyError {
        if err.is_timeout() {
            ShopifyError::Timeout(self.timeout.as_secs())
        } else {
            ShopifyError::Http(err)
        }
    }
}

#[async_trait]
impl CommerceBackend for ShopifyStorefront {
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn create_checkout(
        &self,
        request: &ExternalCheckoutRequest,
    ) -> CheckoutResult<ExternalCheckout> {
        if request.lines.is_empty() {
            return Err(CheckoutError::Validation(
                "no store products in cart".to_string(),
            ));
        }

        debug!(
            "Creating Shopify checkout: {} lines, {} local lines excluded",
            request.lines.len(),
            request.excluded_local_lines
        );

        let checkout = self.checkout_create(CheckoutCreateInput::from(request)).await?;

        info!("Created Shopify checkout: id={}", checkout.checkout_id);
        Ok(checkout)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{Currency, ErrorKind, PriceBreakdown, VariantLine};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storefront(server: &MockServer) -> ShopifyStorefront {
        ShopifyStorefront::new(
            ShopifyConfig::new("glow.myshopify.com", "storefront-token")
                .with_endpoint(format!("{}/api/2023-10/graphql.json", server.uri())),
        )
        .unwrap()
    }

    fn request() -> ExternalCheckoutRequest {
        ExternalCheckoutRequest {
            email: None,
            lines: vec![VariantLine {
                variant_reference: "gid://shopify/ProductVariant/1".to_string(),
                quantity: 3,
            }],
            shipping_address: None,
            allow_partial_addresses: true,
            excluded_local_lines: 1,
            pricing: PriceBreakdown::for_subtotal(6_000),
        }
    }

    #[tokio::test]
    async fn test_create_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/2023-10/graphql.json"))
            .and(header("X-Shopify-Storefront-Access-Token", "storefront-token"))
            .and(body_partial_json(serde_json::json!({
                "variables": {"input": {
                    "lineItems": [{"variantId": "gid://shopify/ProductVariant/1", "quantity": 3}],
                    "allowPartialAddresses": true
                }}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"checkoutCreate": {
                    "checkout": {
                        "id": "gid://shopify/Checkout/abc",
                        "webUrl": "https://glow.myshopify.com/checkouts/abc",
                        "totalPrice": {"amount": "64.8", "currencyCode": "USD"},
                        "subtotalPrice": {"amount": "60.0", "currencyCode": "USD"},
                        "totalTax": {"amount": "4.8", "currencyCode": "USD"}
                    },
                    "userErrors": [],
                    "checkoutUserErrors": []
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checkout = storefront(&server).create_checkout(&request()).await.unwrap();

        assert_eq!(checkout.web_url, "https://glow.myshopify.com/checkouts/abc");
        assert_eq!(checkout.total_minor, 6_480);
        assert_eq!(checkout.subtotal_minor, 6_000);
        assert_eq!(checkout.tax_minor, 480);
        assert_eq!(checkout.currency, Currency::USD);
    }

    #[tokio::test]
    async fn test_user_errors_are_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"checkoutCreate": {
                    "checkout": null,
                    "userErrors": [],
                    "checkoutUserErrors": [
                        {"field": ["input", "lineItems", "0", "variantId"],
                         "message": "Variant is invalid", "code": "INVALID"},
                        {"field": ["input", "email"], "message": "Email is invalid",
                         "code": "INVALID"}
                    ]
                }}
            })))
            .mount(&server)
            .await;

        let err = storefront(&server)
            .create_checkout(&request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackendRejection);
        assert_eq!(
            err.details(),
            vec!["Variant is invalid".to_string(), "Email is invalid".to_string()]
        );
    }

    #[tokio::test]
    async fn test_top_level_graphql_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{"message": "Field 'checkoutCreate' doesn't exist"}]
            })))
            .mount(&server)
            .await;

        let err = storefront(&server)
            .create_checkout(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendRejection);
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = storefront(&server)
            .create_checkout(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_request_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut empty = request();
        empty.lines.clear();
        let err = storefront(&server).create_checkout(&empty).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
