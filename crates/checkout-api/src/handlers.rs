//! # Request Handlers
//!
//! Axum request handlers for the checkout API.
//!
//! Session carts hold one [`CheckoutFlow`] each. A submission takes the
//! flow lock only to begin and to complete an attempt; the backend round
//! trip runs without it so the cart can still be viewed while it is in
//! flight.

use crate::sessions::SharedFlow;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use checkout_core::{
    dispatch, verify_payment, Cart, CartLine, CheckoutError, CheckoutFlow, CheckoutResult,
    CheckoutView, ConfirmationOutcome, DemoProduct, ErrorKind, ItemSource, LocalCatalog,
    PaymentPath, PriceBreakdown, ShippingAddress, ShopperDetails, SubmitOutcome,
    FLAT_SHIPPING_MINOR, FREE_SHIPPING_THRESHOLD_MINOR, TAX_RATE_BASIS_POINTS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add a line to a cart
#[derive(Debug, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AddLineRequest {
    /// Demo product; name and price come from the local catalog
    Local {
        product_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    /// Store product as listed by the commerce backend
    External {
        product_id: String,
        #[serde(default)]
        variant_id: Option<String>,
        name: String,
        unit_price_minor: i64,
        #[serde(default = "default_quantity")]
        quantity: u32,
        #[serde(default)]
        image_url: Option<String>,
    },
}

fn default_quantity() -> u32 {
    1
}

impl AddLineRequest {
    fn into_line(self, catalog: &LocalCatalog) -> CheckoutResult<CartLine> {
        match self {
            AddLineRequest::Local {
                product_id,
                quantity,
            } => catalog.line_for(&product_id, quantity),
            AddLineRequest::External {
                product_id,
                variant_id,
                name,
                unit_price_minor,
                quantity,
                image_url,
            } => {
                let line =
                    CartLine::external(product_id, variant_id, name, unit_price_minor, quantity)?;
                Ok(match image_url {
                    Some(url) => line.with_image(url),
                    None => line,
                })
            }
        }
    }
}

/// Change a line's quantity
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// Card form style for card-processor submissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardMode {
    /// Redirect to the processor's hosted page
    #[default]
    Hosted,
    /// Card form mounted on our own checkout page
    Embedded,
}

/// Submit the checkout for a session cart
#[derive(Debug, Default, Deserialize)]
pub struct SubmitCheckoutRequest {
    /// Requested path; the default selection applies when omitted
    #[serde(default)]
    pub payment_method: Option<PaymentPath>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub mode: CardMode,
}

/// Result of the embedded card form as reported by the browser
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
    /// Set when the card form itself reported a failure
    #[serde(default)]
    pub error: Option<String>,
}

/// A whole cart sent with a one-shot checkout request
#[derive(Debug, Deserialize)]
pub struct CartSnapshotRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

impl CartSnapshotRequest {
    /// Build the cart. Demo lines are re-priced from the catalog.
    fn into_cart(self, catalog: &LocalCatalog) -> CheckoutResult<(Cart, ShopperDetails)> {
        let shopper = shopper_details(self.email, self.shipping_address);
        let lines = self
            .items
            .into_iter()
            .map(|line| match line.source {
                ItemSource::Local => catalog.line_for(&line.item_id, line.quantity),
                ItemSource::External => Ok(line),
            })
            .collect::<CheckoutResult<Vec<_>>>()?;
        Ok((Cart::from_lines(catalog.currency, lines)?, shopper))
    }
}

/// A session cart and its checkout view
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: Uuid,
    #[serde(flatten)]
    pub view: CheckoutView,
}

#[derive(Debug, Serialize)]
pub struct SubmitCheckoutResponse {
    pub success: bool,
    pub attempt: u64,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ConfirmationOutcome,
}

/// Response of the one-shot checkout endpoints
#[derive(Debug, Serialize)]
pub struct StatelessCheckoutResponse {
    pub success: bool,
    pub pricing: PriceBreakdown,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

/// Settings the browser needs to render checkout
#[derive(Debug, Serialize)]
pub struct CheckoutConfigResponse {
    pub card_enabled: bool,
    pub commerce_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_publishable_key: Option<String>,
    pub currency: String,
    pub free_shipping_threshold_minor: i64,
    pub flat_shipping_minor: i64,
    pub tax_rate_basis_points: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
    pub code: u16,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

/// Convert CheckoutError to HTTP response
fn checkout_error_to_response(err: CheckoutError) -> ApiError {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, "Checkout request failed");
    } else {
        debug!(error = %err, "Checkout request refused");
    }

    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.shopper_message(),
            kind: err.kind(),
            code,
            retryable: err.is_retryable(),
            details: err.details(),
        }),
    )
}

fn shopper_details(email: Option<String>, address: Option<ShippingAddress>) -> ShopperDetails {
    let mut shopper = ShopperDetails::default();
    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        shopper = shopper.with_email(email.trim());
    }
    if let Some(address) = address {
        shopper = shopper.with_shipping_address(address);
    }
    shopper
}

async fn cart_response(state: &AppState, cart_id: Uuid, flow: &SharedFlow) -> CartResponse {
    CartResponse {
        cart_id,
        view: flow.lock().await.view(state.capabilities()),
    }
}

async fn session(state: &AppState, cart_id: Uuid) -> ApiResult<SharedFlow> {
    state
        .sessions
        .get(cart_id)
        .await
        .map_err(checkout_error_to_response)
}

/// Clear the cart once the demo confirmation has been on screen long enough
fn schedule_demo_clear(flow: SharedFlow, attempt: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if flow.lock().await.finish_demo_display(attempt) {
            debug!(attempt, "Demo cart cleared");
        }
    });
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let capabilities = state.capabilities();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "glow-checkout",
        "version": env!("CARGO_PKG_VERSION"),
        "card_enabled": capabilities.card_processor_configured,
        "commerce_enabled": state.backends.commerce.is_some(),
        "carts": state.sessions.len().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Settings for the checkout page
pub async fn checkout_config(State(state): State<AppState>) -> Json<CheckoutConfigResponse> {
    Json(CheckoutConfigResponse {
        card_enabled: state.capabilities().card_processor_configured,
        commerce_enabled: state.backends.commerce.is_some(),
        stripe_publishable_key: state.stripe_publishable_key.clone(),
        currency: state.catalog.currency.as_str().to_string(),
        free_shipping_threshold_minor: FREE_SHIPPING_THRESHOLD_MINOR,
        flat_shipping_minor: FLAT_SHIPPING_MINOR,
        tax_rate_basis_points: TAX_RATE_BASIS_POINTS,
    })
}

// ----- Session carts ---------------------------------------------------------

#[instrument(skip(state))]
pub async fn create_cart(State(state): State<AppState>) -> (StatusCode, Json<CartResponse>) {
    let (cart_id, flow) = state.sessions.create(state.catalog.currency).await;
    info!(%cart_id, "Cart created");
    (
        StatusCode::CREATED,
        Json(cart_response(&state, cart_id, &flow).await),
    )
}

/// Cart contents, payment options and pricing
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let flow = session(&state, cart_id).await?;
    Ok(Json(cart_response(&state, cart_id, &flow).await))
}

#[instrument(skip(state))]
pub async fn delete_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .remove(cart_id)
        .await
        .map_err(checkout_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, request))]
pub async fn add_line(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<AddLineRequest>,
) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    let flow = session(&state, cart_id).await?;
    let line = request
        .into_line(&state.catalog)
        .map_err(checkout_error_to_response)?;

    flow.lock()
        .await
        .add_line(line)
        .map_err(checkout_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(cart_response(&state, cart_id, &flow).await),
    ))
}

#[instrument(skip(state, request))]
pub async fn update_line(
    State(state): State<AppState>,
    Path((cart_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartResponse>> {
    let flow = session(&state, cart_id).await?;
    flow.lock()
        .await
        .set_quantity(index, request.quantity)
        .map_err(checkout_error_to_response)?;
    Ok(Json(cart_response(&state, cart_id, &flow).await))
}

#[instrument(skip(state))]
pub async fn remove_line(
    State(state): State<AppState>,
    Path((cart_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<CartResponse>> {
    let flow = session(&state, cart_id).await?;
    flow.lock()
        .await
        .remove_line(index)
        .map_err(checkout_error_to_response)?;
    Ok(Json(cart_response(&state, cart_id, &flow).await))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let flow = session(&state, cart_id).await?;
    flow.lock()
        .await
        .clear_cart()
        .map_err(checkout_error_to_response)?;
    Ok(Json(cart_response(&state, cart_id, &flow).await))
}

// ----- Checkout --------------------------------------------------------------

/// Submit the cart through the selected (or default) payment path
#[instrument(skip(state, request), fields(requested = ?request.payment_method, mode = ?request.mode))]
pub async fn submit_checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<SubmitCheckoutRequest>,
) -> ApiResult<Json<SubmitCheckoutResponse>> {
    let flow = session(&state, cart_id).await?;
    let shopper = shopper_details(request.email, request.shipping_address);
    let card_flow = state.card_flow(request.mode == CardMode::Embedded);

    let ticket = flow
        .lock()
        .await
        .begin(
            request.payment_method,
            state.capabilities(),
            &shopper,
            card_flow,
        )
        .map_err(checkout_error_to_response)?;

    let result = dispatch(&ticket, &state.backends, state.config.checkout_timeout).await;

    let outcome = flow
        .lock()
        .await
        .complete(ticket.attempt, result)
        .map_err(checkout_error_to_response)?;

    if matches!(outcome, SubmitOutcome::DemoConfirmed { .. }) {
        schedule_demo_clear(flow.clone(), ticket.attempt, state.config.demo_clear_delay);
    }

    info!(%cart_id, attempt = ticket.attempt, path = %ticket.path, "Checkout submitted");

    Ok(Json(SubmitCheckoutResponse {
        success: true,
        attempt: ticket.attempt,
        outcome,
    }))
}

/// Verify an embedded card payment after the browser confirmed it
#[instrument(skip(state, request), fields(payment_intent = %request.payment_intent_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> ApiResult<Json<ConfirmPaymentResponse>> {
    let flow = session(&state, cart_id).await?;

    if let Some(reason) = request.error {
        warn!(%cart_id, reason = %reason, "Card form reported failure");
        let mut guard = flow.lock().await;
        guard
            .report_confirmation_failure(&reason)
            .map_err(checkout_error_to_response)?;
        return Err(checkout_error_to_response(CheckoutError::rejected(
            PaymentPath::CardProcessor.as_str(),
            reason,
        )));
    }

    let ticket = flow
        .lock()
        .await
        .begin_confirmation(&request.payment_intent_id)
        .map_err(checkout_error_to_response)?;

    let status = verify_payment(&ticket, &state.backends, state.config.checkout_timeout).await;

    let outcome = flow
        .lock()
        .await
        .complete_confirmation(ticket.attempt, status)
        .map_err(checkout_error_to_response)?;

    Ok(Json(ConfirmPaymentResponse {
        success: true,
        outcome,
    }))
}

/// Abandon the current attempt or dismiss its result
#[instrument(skip(state))]
pub async fn reset_checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let flow = session(&state, cart_id).await?;
    flow.lock().await.reset();
    Ok(Json(cart_response(&state, cart_id, &flow).await))
}

// ----- One-shot checkout -----------------------------------------------------

async fn stateless_checkout(
    state: &AppState,
    snapshot: CartSnapshotRequest,
    path: PaymentPath,
    embedded: bool,
) -> ApiResult<Json<StatelessCheckoutResponse>> {
    let (cart, shopper) = snapshot
        .into_cart(&state.catalog)
        .map_err(checkout_error_to_response)?;

    let mut flow = CheckoutFlow::new(cart);
    let outcome = flow
        .submit(
            Some(path),
            &shopper,
            state.card_flow(embedded),
            &state.backends,
            state.config.checkout_timeout,
        )
        .await
        .map_err(checkout_error_to_response)?;

    // Priced as submitted; a store checkout leaves demo lines out
    let pricing = flow
        .state()
        .pricing()
        .unwrap_or_else(|| PriceBreakdown::for_cart(flow.cart()));

    Ok(Json(StatelessCheckoutResponse {
        success: true,
        pricing,
        outcome,
    }))
}

/// Create a Shopify checkout for the store products in a cart snapshot
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn shopify_checkout(
    State(state): State<AppState>,
    Json(request): Json<CartSnapshotRequest>,
) -> ApiResult<Json<StatelessCheckoutResponse>> {
    stateless_checkout(&state, request, PaymentPath::ExternalCommerce, false).await
}

/// Create a hosted Stripe Checkout session for a cart snapshot
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn stripe_checkout(
    State(state): State<AppState>,
    Json(request): Json<CartSnapshotRequest>,
) -> ApiResult<Json<StatelessCheckoutResponse>> {
    stateless_checkout(&state, request, PaymentPath::CardProcessor, false).await
}

/// Create a payment intent for the embedded card form
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn stripe_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CartSnapshotRequest>,
) -> ApiResult<Json<StatelessCheckoutResponse>> {
    stateless_checkout(&state, request, PaymentPath::CardProcessor, true).await
}

// ----- Products --------------------------------------------------------------

/// List in-stock demo products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<&DemoProduct> = state.catalog.in_stock_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len(),
        "currency": state.catalog.currency.as_str(),
    }))
}

/// Get a single demo product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<DemoProduct>> {
    state
        .catalog
        .get(&product_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            checkout_error_to_response(CheckoutError::NotFound(format!("product {}", product_id)))
        })
}

// ----- Pages -----------------------------------------------------------------

/// Success page (hosted card checkout redirects here)
pub async fn checkout_success(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let session_id = params
        .get("session_id")
        .map(|s| html_escape(s))
        .unwrap_or_else(|| "unknown".to_string());
    Html(format!(
        r#"
<!DOCTYPE html>
<html>
<head><title>Order Confirmed</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #fdf6f0;">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Thank you for your order!</h1>
        <p>Reference: <code>{}</code></p>
        <p style="color: #666;">A confirmation email is on its way.</p>
        <a href="/">Continue shopping</a>
    </div>
</body>
</html>
"#,
        session_id
    ))
}

/// Cancel page (hosted card checkout returns here)
pub async fn checkout_cancel() -> impl IntoResponse {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head><title>Checkout Cancelled</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #fdf6f0;">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Checkout cancelled</h1>
        <p style="color: #666;">Your cart has been saved. You were not charged.</p>
        <a href="/">Back to the shop</a>
    </div>
</body>
</html>
"#,
    )
}

fn html_escape(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_from_rejection() {
        let err = CheckoutError::BackendRejection {
            provider: "shopify".to_string(),
            messages: vec!["Email is invalid".to_string(), "Zip is invalid".to_string()],
        };

        let (status, Json(body)) = checkout_error_to_response(err);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.kind, ErrorKind::BackendRejection);
        assert_eq!(body.details.len(), 2);
        assert!(body.retryable);
    }

    #[test]
    fn test_error_response_hides_transport_detail() {
        let (status, Json(body)) =
            checkout_error_to_response(CheckoutError::Transport("connection reset".to_string()));

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.error.contains("connection reset"));
        assert!(body.details.is_empty());

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_add_line_request_shapes() {
        let local: AddLineRequest =
            serde_json::from_str(r#"{"source": "local", "product_id": "niacinamide"}"#).unwrap();
        assert!(matches!(
            local,
            AddLineRequest::Local { quantity: 1, .. }
        ));

        let external: AddLineRequest = serde_json::from_str(
            r#"{"source": "external", "product_id": "gid://shopify/Product/1",
                "variant_id": "gid://shopify/ProductVariant/1",
                "name": "Rose Toner", "unit_price_minor": 1500, "quantity": 2}"#,
        )
        .unwrap();
        let line = external.into_line(&LocalCatalog::default()).unwrap();
        assert!(line.is_external());
        assert_eq!(line.line_total_minor(), 3_000);
    }

    #[test]
    fn test_shopper_details_ignores_blank_email() {
        assert_eq!(
            shopper_details(Some("   ".to_string()), None),
            ShopperDetails::default()
        );
        assert_eq!(
            shopper_details(Some(" a@example.com ".to_string()), None).email,
            Some("a@example.com".to_string())
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>&"), "&lt;b&gt;&amp;");
        assert_eq!(html_escape("cs_test_123"), "cs_test_123");
    }
}
