//! # Stripe Card Processor
//!
//! Hosted Checkout Sessions for the redirect flow, PaymentIntents for the
//! embedded form, and PaymentIntent retrieval to confirm the embedded result.

use crate::config::StripeConfig;
use crate::form::{payment_intent_form_params, session_form_params};
use async_trait::async_trait;
use chrono::DateTime;
use checkout_core::{
    CardCheckoutRequest, CardProcessor, CardSession, CheckoutError, CheckoutResult,
    PaymentIntentHandle, PaymentIntentStatus,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe card processor
///
/// Talks to the Stripe REST API directly with form-encoded requests.
pub struct StripeCardProcessor {
    config: StripeConfig,
    client: Client,
    timeout: Duration,
}

impl StripeCardProcessor {
    /// Create a processor. Fails if the config is unusable.
    pub fn new(config: StripeConfig) -> CheckoutResult<Self> {
        Self::with_timeout(config, Duration::from_secs(30))
    }

    pub fn with_timeout(config: StripeConfig, timeout: Duration) -> CheckoutResult<Self> {
        config.validate()?;

        let client = Client::builder()
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
        Self::new(StripeConfig::from_env())
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    /// Send a request and decode a 2xx body as `T`
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> CheckoutResult<T> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            // Parse Stripe error
            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(CheckoutError::rejected(PROVIDER, error_response.error.message));
            }

            return Err(CheckoutError::UnexpectedResponse {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        serde_json::from_str(&body).map_err(|e| CheckoutError::UnexpectedResponse {
            provider: PROVIDER.to_string(),
            message: format!("Failed to parse Stripe response: {}", e),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> CheckoutError {
        if err.is_timeout() {
            CheckoutError::Timeout {
                provider: PROVIDER.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            CheckoutError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl CardProcessor for StripeCardProcessor {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &CardCheckoutRequest,
        idempotency_key: &str,
    ) -> CheckoutResult<CardSession> {
        let form_params = session_form_params(request)?;

        debug!(
            "Creating Stripe checkout session: {} line items, total={}",
            request.line_items.len(),
            request.charged_total()
        );

        let builder = self
            .authorized(self.client.post(self.url("/v1/checkout/sessions")))
            .header("Idempotency-Key", idempotency_key)
            .form(&form_params);

        let session: StripeCheckoutSessionResponse = self.execute(builder).await?;

        let url = session.url.ok_or_else(|| CheckoutError::UnexpectedResponse {
            provider: PROVIDER.to_string(),
            message: format!("session {} has no URL", session.id),
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(CardSession {
            session_id: session.id,
            url,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }

    #[instrument(skip(self, request), fields(amount = request.charged_total()))]
    async fn create_payment_intent(
        &self,
        request: &CardCheckoutRequest,
        idempotency_key: &str,
    ) -> CheckoutResult<PaymentIntentHandle> {
        let form_params = payment_intent_form_params(request);

        let builder = self
            .authorized(self.client.post(self.url("/v1/payment_intents")))
            .header("Idempotency-Key", idempotency_key)
            .form(&form_params);

        let intent: StripePaymentIntentResponse = self.execute(builder).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| CheckoutError::UnexpectedResponse {
                provider: PROVIDER.to_string(),
                message: format!("payment intent {} has no client secret", intent.id),
            })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntentHandle {
            payment_intent_id: intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> CheckoutResult<PaymentIntentStatus> {
        if payment_intent_id.is_empty() || payment_intent_id.contains('/') {
            return Err(CheckoutError::Validation(format!(
                "invalid payment intent id: {:?}",
                payment_intent_id
            )));
        }

        let builder = self.authorized(
            self.client
                .get(self.url(&format!("/v1/payment_intents/{}", payment_intent_id))),
        );

        let intent: StripePaymentIntentResponse = self.execute(builder).await?;
        debug!("Payment intent {} status={}", intent.id, intent.status);

        Ok(PaymentIntentStatus::from_stripe(&intent.status))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{
        build_card_checkout, CardFlow, Cart, CartLine, Currency, ErrorKind, ShopperDetails,
    };
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn processor(server: &MockServer) -> StripeCardProcessor {
        StripeCardProcessor::new(
            StripeConfig::new("sk_test_abc", "pk_test_xyz").with_api_base_url(server.uri()),
        )
        .unwrap()
    }

    fn request(flow: CardFlow) -> CardCheckoutRequest {
        let cart = Cart::from_lines(
            Currency::USD,
            vec![CartLine::local("niacinamide", "Niacinamide", 599, 1).unwrap()],
        )
        .unwrap();
        build_card_checkout(&cart, &ShopperDetails::default(), flow).unwrap()
    }

    fn hosted() -> CardFlow {
        CardFlow::HostedSession {
            success_url: "http://localhost/checkout/success".to_string(),
            cancel_url: "http://localhost/checkout".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_unconfigured() {
        assert!(StripeCardProcessor::new(StripeConfig::new("", "")).is_err());
    }

    #[tokio::test]
    async fn test_create_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_abc"))
            .and(header("Idempotency-Key", "attempt-1"))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_123",
                "expires_at": 1_900_000_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = processor(&server)
            .create_session(&request(hosted()), "attempt-1")
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_123");
        assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_123");
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_card_error_is_backend_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {
                    "type": "card_error",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let err = processor(&server)
            .create_payment_intent(&request(CardFlow::Embedded), "attempt-2")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackendRejection);
        assert_eq!(err.shopper_message(), "Your card was declined.");
    }

    #[tokio::test]
    async fn test_unparseable_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = processor(&server)
            .create_session(&request(hosted()), "attempt-3")
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::UnexpectedResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_create_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(body_string_contains("amount=1246"))
            .and(body_string_contains("automatic_payment_methods%5Benabled%5D=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "status": "requires_payment_method",
                "client_secret": "pi_123_secret_456"
            })))
            .mount(&server)
            .await;

        let handle = processor(&server)
            .create_payment_intent(&request(CardFlow::Embedded), "attempt-4")
            .await
            .unwrap();

        assert_eq!(handle.payment_intent_id, "pi_123");
        assert_eq!(handle.client_secret, "pi_123_secret_456");
    }

    #[tokio::test]
    async fn test_retrieve_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "status": "succeeded"
            })))
            .mount(&server)
            .await;

        let status = processor(&server)
            .retrieve_payment_intent("pi_123")
            .await
            .unwrap();
        assert_eq!(status, PaymentIntentStatus::Succeeded);

        assert!(processor(&server)
            .retrieve_payment_intent("../v1/charges")
            .await
            .is_err());
    }
}
