//! # Checkout Orchestrator
//!
//! Owns one cart and drives it through a single checkout attempt at a time.
//!
//! ```text
//!            begin()                complete(Ok)
//!   IDLE ───────────────► SUBMITTING ──────────────► SUCCEEDED
//!    ▲                      │    │                       │
//!    │        complete(Err) │    │ embedded card form    │ demo display
//!    │                      ▼    ▼                       │ delay elapsed
//!    └──── mutate/retry ── FAILED ◄── confirmation ──────┘
//!                                      failed
//! ```
//!
//! Submission is split into three steps so a caller holding the flow behind
//! a lock can release it during the network round trip:
//!
//! 1. [`CheckoutFlow::begin`] resolves the path, builds the payload and
//!    enters `SUBMITTING` (sync, under the lock)
//! 2. [`dispatch`] talks to the backend with a bounded wait (async, no lock)
//! 3. [`CheckoutFlow::complete`] applies the result (sync, under the lock)
//!
//! The embedded card form adds a second round trip through
//! [`CheckoutFlow::begin_confirmation`], [`verify_payment`] and
//! [`CheckoutFlow::complete_confirmation`].
//!
//! The cart is cleared exactly once, only after the backend (or the
//! confirmation) reported success. Demo checkouts defer the clear until
//! [`CheckoutFlow::finish_demo_display`].

use crate::backend::{
    BackendTotals, Backends, CardSession, ExternalCheckout, PaymentIntentHandle,
    PaymentIntentStatus,
};
use crate::cart::{Cart, CartComposition, CartLine};
use crate::eligibility::{self, Capabilities, PathSelection, PaymentPath, PaymentPathOption};
use crate::error::{CheckoutError, CheckoutResult, ErrorKind};
use crate::payload::{
    build_payload, CardFlow, CheckoutPayload, DemoConfirmation, ShopperDetails,
};
use crate::pricing::{PriceBreakdown, PriceSummary};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default bounded wait for a backend round trip
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Where an in-flight submission is waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SubmitPhase {
    /// Payload sent, waiting for the backend
    AwaitingBackend,
    /// Payment intent created; waiting for the shopper to complete the
    /// embedded form and for us to verify it
    AwaitingConfirmation {
        payment_intent_id: String,
        #[serde(skip_serializing)]
        client_secret: String,
    },
}

/// A successful checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub attempt: u64,
    pub path: PaymentPath,
    /// What was submitted for this attempt; external checkouts price only
    /// the store lines
    pub pricing: PriceBreakdown,
    /// Totals the commerce backend reported for its hosted checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_totals: Option<BackendTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Backend checkout, session or payment intent id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub message: String,
    /// False while a demo confirmation is still on screen
    pub cart_cleared: bool,
}

/// A failed checkout attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutFailure {
    pub attempt: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PaymentPath>,
    pub kind: ErrorKind,
    /// Shopper-facing message
    pub message: String,
    /// One entry per backend error, when the backend sent a list
    pub details: Vec<String>,
    pub retryable: bool,
}

impl CheckoutFailure {
    fn from_error(attempt: u64, path: Option<PaymentPath>, err: &CheckoutError) -> Self {
        Self {
            attempt,
            path,
            kind: err.kind(),
            message: err.shopper_message(),
            details: err.details(),
            retryable: err.is_retryable(),
        }
    }
}

/// Checkout lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Submitting {
        attempt: u64,
        path: PaymentPath,
        /// Pricing of the payload that was sent
        pricing: PriceBreakdown,
        phase: SubmitPhase,
    },
    Succeeded(CheckoutReceipt),
    Failed(CheckoutFailure),
}

impl CheckoutState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, CheckoutState::Submitting { .. })
    }

    /// Pricing of the attempt in flight or just completed
    pub fn pricing(&self) -> Option<PriceBreakdown> {
        match self {
            CheckoutState::Submitting { pricing, .. } => Some(*pricing),
            CheckoutState::Succeeded(receipt) => Some(receipt.pricing),
            CheckoutState::Idle | CheckoutState::Failed(_) => None,
        }
    }
}

/// Everything [`dispatch`] needs for one attempt
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub attempt: u64,
    pub path: PaymentPath,
    pub payload: CheckoutPayload,
    /// Unique per attempt; sent to the card processor
    pub idempotency_key: String,
}

/// What a backend answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    External(ExternalCheckout),
    CardSession(CardSession),
    PaymentIntent(PaymentIntentHandle),
    Demo(DemoConfirmation),
}

/// What the shopper should see after a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Send the shopper to a hosted checkout page
    Redirect {
        path: PaymentPath,
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Backend-computed totals, when the backend reports them
        #[serde(skip_serializing_if = "Option::is_none")]
        totals: Option<BackendTotals>,
    },
    /// Mount the embedded card form with this secret
    EmbeddedForm {
        payment_intent_id: String,
        client_secret: String,
    },
    /// Demo order accepted; the confirmation is displayed before the cart
    /// is cleared
    DemoConfirmed { confirmation: DemoConfirmation },
}

/// Result of verifying an embedded card payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Confirmed { receipt: CheckoutReceipt },
    /// Processor is still working on it; verify again later
    Pending { payment_intent_id: String },
}

/// Ticket for the confirmation round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationTicket {
    pub attempt: u64,
    pub payment_intent_id: String,
}

/// Snapshot for rendering the checkout page
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub composition: CartComposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
    pub options: Vec<PaymentPathOption>,
    pub selection: PathSelection,
    pub can_checkout: bool,
    pub pricing: PriceBreakdown,
    pub summary: PriceSummary,
    pub state: CheckoutState,
}

/// A cart and its checkout lifecycle
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    cart: Cart,
    state: CheckoutState,
    attempts: u64,
}

impl CheckoutFlow {
    pub fn new(cart: Cart) -> Self {
        Self {
            cart,
            state: CheckoutState::Idle,
            attempts: 0,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    pub fn add_line(&mut self, line: CartLine) -> CheckoutResult<usize> {
        self.ensure_mutable()?;
        self.cart.add(line)
    }

    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> CheckoutResult<()> {
        self.ensure_mutable()?;
        self.cart.set_quantity(index, quantity)
    }

    pub fn remove_line(&mut self, index: usize) -> CheckoutResult<CartLine> {
        self.ensure_mutable()?;
        self.cart.remove(index)
    }

    pub fn clear_cart(&mut self) -> CheckoutResult<()> {
        self.ensure_mutable()?;
        self.cart.clear();
        Ok(())
    }

    /// Shopper edits are refused mid-submission. Any finished attempt is
    /// settled and the flow returns to idle.
    fn ensure_mutable(&mut self) -> CheckoutResult<()> {
        if self.state.is_submitting() {
            return Err(CheckoutError::CheckoutInProgress);
        }
        self.settle_pending_clear();
        self.state = CheckoutState::Idle;
        Ok(())
    }

    /// Perform a deferred demo clear now, if one is outstanding
    fn settle_pending_clear(&mut self) {
        if let CheckoutState::Succeeded(receipt) = &mut self.state {
            if !receipt.cart_cleared {
                self.cart.clear();
                receipt.cart_cleared = true;
            }
        }
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Options, default selection and pricing for the current cart. An
    /// empty cart has no selection even when a path is eligible.
    pub fn view(&self, capabilities: Capabilities) -> CheckoutView {
        let eligibility = eligibility::resolve(&self.cart, capabilities);
        let composition = self.cart.composition();
        let pricing = PriceBreakdown::for_cart(&self.cart);
        let selection = if self.cart.is_empty() {
            PathSelection::Unavailable
        } else {
            eligibility.selection()
        };

        CheckoutView {
            lines: self.cart.lines().to_vec(),
            item_count: self.cart.item_count(),
            composition,
            notice: composition.notice(),
            options: eligibility.options().to_vec(),
            selection,
            can_checkout: eligibility.can_checkout() && !self.cart.is_empty(),
            pricing,
            summary: pricing.in_currency(self.cart.currency()),
            state: self.state.clone(),
        }
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Pick the path, build its payload and enter `SUBMITTING`.
    ///
    /// Path selection errors leave the state untouched. A payload that fails
    /// to build moves the flow to `FAILED` without contacting any backend.
    pub fn begin(
        &mut self,
        requested: Option<PaymentPath>,
        capabilities: Capabilities,
        shopper: &ShopperDetails,
        card_flow: CardFlow,
    ) -> CheckoutResult<SubmissionTicket> {
        if self.state.is_submitting() {
            warn!("Refusing checkout submit: attempt already in flight");
            return Err(CheckoutError::CheckoutInProgress);
        }
        self.settle_pending_clear();

        let path = eligibility::resolve(&self.cart, capabilities).select(requested)?;

        self.attempts += 1;
        let attempt = self.attempts;

        let payload = match build_payload(path, &self.cart, shopper, card_flow) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(attempt, path = %path, error = %err, "Checkout payload rejected");
                self.state =
                    CheckoutState::Failed(CheckoutFailure::from_error(attempt, Some(path), &err));
                return Err(err);
            }
        };

        info!(attempt, path = %path, lines = self.cart.len(), "Checkout submitting");

        self.state = CheckoutState::Submitting {
            attempt,
            path,
            pricing: payload.pricing(),
            phase: SubmitPhase::AwaitingBackend,
        };

        Ok(SubmissionTicket {
            attempt,
            path,
            payload,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }

    /// Apply a backend response to the attempt that produced it
    pub fn complete(
        &mut self,
        attempt: u64,
        result: CheckoutResult<BackendResponse>,
    ) -> CheckoutResult<SubmitOutcome> {
        let (path, pricing) = match &self.state {
            CheckoutState::Submitting {
                attempt: current,
                path,
                pricing,
                phase: SubmitPhase::AwaitingBackend,
            } if *current == attempt => (*path, *pricing),
            _ => return Err(stale_attempt(attempt)),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(attempt, path = %path, error = %err, "Checkout failed");
                self.state =
                    CheckoutState::Failed(CheckoutFailure::from_error(attempt, Some(path), &err));
                return Err(err);
            }
        };

        match response {
            BackendResponse::External(checkout) => {
                let totals = checkout.totals();
                if totals.total != pricing.total {
                    info!(
                        attempt,
                        submitted = pricing.total,
                        reported = totals.total,
                        "Commerce backend total differs from submitted pricing"
                    );
                }
                self.succeed(CheckoutReceipt {
                    attempt,
                    path,
                    pricing,
                    backend_totals: Some(totals),
                    redirect_url: Some(checkout.web_url.clone()),
                    reference: Some(checkout.checkout_id.clone()),
                    message: "Redirecting to checkout".to_string(),
                    cart_cleared: false,
                });
                Ok(SubmitOutcome::Redirect {
                    path,
                    url: checkout.web_url,
                    session_id: Some(checkout.checkout_id),
                    totals: Some(totals),
                })
            }
            BackendResponse::CardSession(session) => {
                self.succeed(CheckoutReceipt {
                    attempt,
                    path,
                    pricing,
                    backend_totals: None,
                    redirect_url: Some(session.url.clone()),
                    reference: Some(session.session_id.clone()),
                    message: "Redirecting to secure payment".to_string(),
                    cart_cleared: false,
                });
                Ok(SubmitOutcome::Redirect {
                    path,
                    url: session.url,
                    session_id: Some(session.session_id),
                    totals: None,
                })
            }
            BackendResponse::PaymentIntent(handle) => {
                debug!(attempt, payment_intent = %handle.payment_intent_id, "Awaiting card confirmation");
                self.state = CheckoutState::Submitting {
                    attempt,
                    path,
                    pricing,
                    phase: SubmitPhase::AwaitingConfirmation {
                        payment_intent_id: handle.payment_intent_id.clone(),
                        client_secret: handle.client_secret.clone(),
                    },
                };
                Ok(SubmitOutcome::EmbeddedForm {
                    payment_intent_id: handle.payment_intent_id,
                    client_secret: handle.client_secret,
                })
            }
            BackendResponse::Demo(confirmation) => {
                info!(attempt, "Demo checkout confirmed");
                self.state = CheckoutState::Succeeded(CheckoutReceipt {
                    attempt,
                    path,
                    pricing: confirmation.pricing,
                    backend_totals: None,
                    redirect_url: None,
                    reference: None,
                    message: confirmation.message.clone(),
                    cart_cleared: false,
                });
                Ok(SubmitOutcome::DemoConfirmed { confirmation })
            }
        }
    }

    /// Enter `SUCCEEDED` and clear the cart
    fn succeed(&mut self, mut receipt: CheckoutReceipt) -> CheckoutReceipt {
        info!(attempt = receipt.attempt, path = %receipt.path, "Checkout succeeded");
        self.cart.clear();
        receipt.cart_cleared = true;
        self.state = CheckoutState::Succeeded(receipt.clone());
        receipt
    }

    /// Begin, dispatch and complete in one call. Only suitable when the
    /// caller owns the flow outright.
    pub async fn submit(
        &mut self,
        requested: Option<PaymentPath>,
        shopper: &ShopperDetails,
        card_flow: CardFlow,
        backends: &Backends,
        timeout: Duration,
    ) -> CheckoutResult<SubmitOutcome> {
        let ticket = self.begin(requested, backends.capabilities(), shopper, card_flow)?;
        let result = dispatch(&ticket, backends, timeout).await;
        self.complete(ticket.attempt, result)
    }

    // =========================================================================
    // Embedded card confirmation
    // =========================================================================

    /// Check that `payment_intent_id` is the one this flow is waiting on
    pub fn begin_confirmation(&self, payment_intent_id: &str) -> CheckoutResult<ConfirmationTicket> {
        match &self.state {
            CheckoutState::Submitting {
                attempt,
                phase: SubmitPhase::AwaitingConfirmation {
                    payment_intent_id: expected,
                    ..
                },
                ..
            } => {
                if expected != payment_intent_id {
                    return Err(CheckoutError::Validation(format!(
                        "payment {} does not belong to this checkout",
                        payment_intent_id
                    )));
                }
                Ok(ConfirmationTicket {
                    attempt: *attempt,
                    payment_intent_id: expected.clone(),
                })
            }
            _ => Err(CheckoutError::Precondition(
                "no card payment is awaiting confirmation".to_string(),
            )),
        }
    }

    /// Apply the verified payment intent status
    pub fn complete_confirmation(
        &mut self,
        attempt: u64,
        result: CheckoutResult<PaymentIntentStatus>,
    ) -> CheckoutResult<ConfirmationOutcome> {
        let (path, pricing, payment_intent_id) = match &self.state {
            CheckoutState::Submitting {
                attempt: current,
                path,
                pricing,
                phase: SubmitPhase::AwaitingConfirmation {
                    payment_intent_id, ..
                },
            } if *current == attempt => (*path, *pricing, payment_intent_id.clone()),
            _ => return Err(stale_attempt(attempt)),
        };

        let status = match result {
            Ok(status) => status,
            Err(err) => {
                self.fail_confirmation(attempt, path, &err);
                return Err(err);
            }
        };

        match status {
            PaymentIntentStatus::Succeeded => {
                let receipt = CheckoutReceipt {
                    attempt,
                    path,
                    pricing,
                    backend_totals: None,
                    redirect_url: None,
                    reference: Some(payment_intent_id),
                    message: "Payment successful".to_string(),
                    cart_cleared: false,
                };
                Ok(ConfirmationOutcome::Confirmed {
                    receipt: self.succeed(receipt),
                })
            }
            PaymentIntentStatus::Processing => {
                debug!(attempt, payment_intent = %payment_intent_id, "Card payment still processing");
                Ok(ConfirmationOutcome::Pending { payment_intent_id })
            }
            other => {
                let err = CheckoutError::rejected(
                    path.as_str(),
                    format!("Payment was not completed (status: {})", other.as_str()),
                );
                self.fail_confirmation(attempt, path, &err);
                Err(err)
            }
        }
    }

    /// The embedded form reported an error (declined card, closed form)
    pub fn report_confirmation_failure(&mut self, reason: &str) -> CheckoutResult<()> {
        let (attempt, path) = match &self.state {
            CheckoutState::Submitting {
                attempt,
                path,
                phase: SubmitPhase::AwaitingConfirmation { .. },
                ..
            } => (*attempt, *path),
            _ => {
                return Err(CheckoutError::Precondition(
                    "no card payment is awaiting confirmation".to_string(),
                ))
            }
        };
        let err = CheckoutError::rejected(path.as_str(), reason);
        self.fail_confirmation(attempt, path, &err);
        Ok(())
    }

    fn fail_confirmation(&mut self, attempt: u64, path: PaymentPath, err: &CheckoutError) {
        warn!(attempt, error = %err, "Card confirmation failed");
        self.state = CheckoutState::Failed(CheckoutFailure::from_error(attempt, Some(path), err));
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Clear the cart once the demo confirmation has been shown.
    /// Returns true if this call cleared it.
    pub fn finish_demo_display(&mut self, attempt: u64) -> bool {
        match &self.state {
            CheckoutState::Succeeded(receipt)
                if receipt.attempt == attempt && !receipt.cart_cleared =>
            {
                self.cart.clear();
                self.state = CheckoutState::Idle;
                debug!(attempt, "Demo confirmation dismissed, cart cleared");
                true
            }
            _ => false,
        }
    }

    /// Abandon the current attempt. Nothing needs compensating; a late
    /// response for the abandoned attempt is ignored.
    pub fn reset(&mut self) {
        self.settle_pending_clear();
        if self.state.is_submitting() {
            info!("Checkout attempt abandoned");
        }
        self.state = CheckoutState::Idle;
    }
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new(Cart::default())
    }
}

fn stale_attempt(attempt: u64) -> CheckoutError {
    CheckoutError::Precondition(format!("checkout attempt {} is no longer active", attempt))
}

/// Bound a backend future by `limit`
async fn bounded<T>(
    provider: &str,
    limit: Duration,
    call: impl Future<Output = CheckoutResult<T>>,
) -> CheckoutResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(provider, seconds = limit.as_secs(), "Backend timed out");
            Err(CheckoutError::Timeout {
                provider: provider.to_string(),
                seconds: limit.as_secs(),
            })
        }
    }
}

/// Send a ticket's payload to its backend. Only the ticket's path is
/// contacted; the demo path makes no call at all.
pub async fn dispatch(
    ticket: &SubmissionTicket,
    backends: &Backends,
    timeout: Duration,
) -> CheckoutResult<BackendResponse> {
    match &ticket.payload {
        CheckoutPayload::External(request) => {
            let backend = backends.commerce.as_ref().ok_or_else(|| {
                CheckoutError::Configuration("commerce backend is not configured".to_string())
            })?;
            bounded(
                backend.provider_name(),
                timeout,
                backend.create_checkout(request),
            )
            .await
            .map(BackendResponse::External)
        }
        CheckoutPayload::Card(request) => {
            let processor = backends.card.as_ref().ok_or_else(|| {
                CheckoutError::Configuration("card processor is not configured".to_string())
            })?;
            match request.flow {
                CardFlow::HostedSession { .. } => bounded(
                    processor.provider_name(),
                    timeout,
                    processor.create_session(request, &ticket.idempotency_key),
                )
                .await
                .map(BackendResponse::CardSession),
                CardFlow::Embedded => bounded(
                    processor.provider_name(),
                    timeout,
                    processor.create_payment_intent(request, &ticket.idempotency_key),
                )
                .await
                .map(BackendResponse::PaymentIntent),
            }
        }
        CheckoutPayload::Demo(confirmation) => Ok(BackendResponse::Demo(confirmation.clone())),
    }
}

/// Retrieve the payment intent named by a confirmation ticket
pub async fn verify_payment(
    ticket: &ConfirmationTicket,
    backends: &Backends,
    timeout: Duration,
) -> CheckoutResult<PaymentIntentStatus> {
    let processor = backends.card.as_ref().ok_or_else(|| {
        CheckoutError::Configuration("card processor is not configured".to_string())
    })?;
    bounded(
        processor.provider_name(),
        timeout,
        processor.retrieve_payment_intent(&ticket.payment_intent_id),
    )
    .await
}
