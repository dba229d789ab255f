//! # Checkout Error Types
//!
//! Typed error handling for the checkout engine.
//! Every builder, backend call and orchestrator step returns
//! `Result<T, CheckoutError>`.

use crate::eligibility::PaymentPath;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification shown to the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or empty cart/request, caught before any network call
    Validation,
    /// The backend answered with an explicit error list
    BackendRejection,
    /// Network failure, timeout or a response we could not understand
    Transport,
    /// Internal misuse of the engine
    Precondition,
}

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed or empty cart/request
    #[error("Invalid checkout request: {0}")]
    Validation(String),

    /// Requested payment path is not eligible for this cart
    #[error("Payment method not available for this cart: {path}")]
    NotEligible { path: PaymentPath },

    /// No payment path is eligible; checkout cannot proceed
    #[error("No payment method is available for this cart")]
    NoEligiblePath,

    /// A submission is already in flight for this cart
    #[error("A checkout is already in progress for this cart")]
    CheckoutInProgress,

    /// Backend returned an explicit error list (declined card, bad address, ...)
    #[error("Rejected by {provider}: {}", messages.join("; "))]
    BackendRejection {
        provider: String,
        messages: Vec<String>,
    },

    /// Network/HTTP error talking to a backend
    #[error("Network error: {0}")]
    Transport(String),

    /// Backend did not answer within the bounded wait
    #[error("{provider} did not respond within {seconds} seconds")]
    Timeout { provider: String, seconds: u64 },

    /// Backend answered with a shape we do not understand
    #[error("Unexpected response from {provider}: {message}")]
    UnexpectedResponse { provider: String, message: String },

    /// Internal misuse, e.g. a demo build on a cart with external items
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cart, line or product not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckoutError {
    /// Shorthand for a single-message backend rejection
    pub fn rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        CheckoutError::BackendRejection {
            provider: provider.into(),
            messages: vec![message.into()],
        }
    }

    /// Map onto the four-way taxonomy surfaced to shoppers
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Validation(_)
            | CheckoutError::NotEligible { .. }
            | CheckoutError::NoEligiblePath
            | CheckoutError::CheckoutInProgress
            | CheckoutError::NotFound(_) => ErrorKind::Validation,
            CheckoutError::BackendRejection { .. } => ErrorKind::BackendRejection,
            CheckoutError::Transport(_)
            | CheckoutError::Timeout { .. }
            | CheckoutError::UnexpectedResponse { .. }
            | CheckoutError::Configuration(_)
            | CheckoutError::Serialization(_) => ErrorKind::Transport,
            CheckoutError::Precondition(_) => ErrorKind::Precondition,
        }
    }

    /// Returns true if the shopper may retry the same submission unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::BackendRejection | ErrorKind::Transport
        )
    }

    /// Message safe to show the shopper.
    ///
    /// Rejections are surfaced verbatim; transport problems collapse into a
    /// generic message.
    pub fn shopper_message(&self) -> String {
        match self.kind() {
            ErrorKind::Transport => "Something went wrong. Please try again.".to_string(),
            ErrorKind::BackendRejection => match self {
                CheckoutError::BackendRejection { messages, .. } if !messages.is_empty() => {
                    messages.join("; ")
                }
                _ => "Checkout was rejected".to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Individual error lines (backend rejections keep one entry per error)
    pub fn details(&self) -> Vec<String> {
        match self {
            CheckoutError::BackendRejection { messages, .. } => messages.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Validation(_) => 400,
            CheckoutError::NotEligible { .. } => 400,
            CheckoutError::NoEligiblePath => 422,
            CheckoutError::CheckoutInProgress => 409,
            CheckoutError::BackendRejection { .. } => 400,
            CheckoutError::Transport(_) => 503,
            CheckoutError::Timeout { .. } => 504,
            CheckoutError::UnexpectedResponse { .. } => 502,
            CheckoutError::Precondition(_) => 500,
            CheckoutError::Configuration(_) => 500,
            CheckoutError::NotFound(_) => 404,
            CheckoutError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CheckoutError::Validation("empty".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CheckoutError::rejected("shopify", "Invalid zip").kind(),
            ErrorKind::BackendRejection
        );
        assert_eq!(
            CheckoutError::Timeout {
                provider: "stripe".into(),
                seconds: 30
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            CheckoutError::Precondition("demo on external cart".into()).kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CheckoutError::Transport("connection reset".into()).is_retryable());
        assert!(CheckoutError::rejected("stripe", "Your card was declined.").is_retryable());
        assert!(!CheckoutError::Validation("empty".into()).is_retryable());
        assert!(!CheckoutError::CheckoutInProgress.is_retryable());
    }

    #[test]
    fn test_shopper_message() {
        let rejection = CheckoutError::BackendRejection {
            provider: "shopify".into(),
            messages: vec!["Zip is invalid".into(), "Province is required".into()],
        };
        assert_eq!(
            rejection.shopper_message(),
            "Zip is invalid; Province is required"
        );
        assert_eq!(rejection.details().len(), 2);

        let transport = CheckoutError::Transport("dns failure".into());
        assert_eq!(
            transport.shopper_message(),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckoutError::Validation("x".into()).status_code(), 400);
        assert_eq!(CheckoutError::CheckoutInProgress.status_code(), 409);
        assert_eq!(CheckoutError::NotFound("cart".into()).status_code(), 404);
        assert_eq!(
            CheckoutError::Timeout {
                provider: "shopify".into(),
                seconds: 30
            }
            .status_code(),
            504
        );
    }
}
