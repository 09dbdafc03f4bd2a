//! Payment provider port for external payment processing.
//!
//! Defines the contract for payment gateway integrations (e.g., ZaloPay).
//! Implementations handle order creation and callback verification.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any order-based provider
//! - **One-shot orders**: Each purchase is a single prepaid order, not a
//!   recurring subscription mandate
//! - **Idempotent**: Callback events carry the provider transaction id so
//!   replays can be detected downstream

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
///
/// Handles payment order creation and callback verification.
/// Implementations must never log gateway secrets.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment order for a plan purchase.
    ///
    /// Returns the provider order id and the URL the user completes payment
    /// at. No membership state changes until the callback confirms the
    /// charge.
    async fn create_order(&self, request: CreateOrderRequest)
        -> Result<PaymentOrder, PaymentError>;

    /// Verify a payment callback and decode the confirmed purchase.
    ///
    /// Returns the parsed event if the signature is authentic and fresh,
    /// error otherwise.
    async fn verify_callback(&self, body: &[u8]) -> Result<CallbackEvent, PaymentError>;
}

/// Request to create a payment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Internal user ID (embedded in the order for the callback round trip).
    pub user_id: UserId,

    /// Plan code being purchased.
    pub plan_code: String,

    /// Plan display name shown at the gateway.
    pub plan_name: String,

    /// Amount to charge, in VND.
    pub amount: i64,
}

/// A created payment order awaiting completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Provider-side order id (the merchant transaction id).
    pub order_id: String,

    /// URL the user completes payment at.
    pub order_url: String,
}

/// A verified, decoded payment callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    /// Gateway that confirmed the charge (e.g. "zalopay").
    pub provider: String,

    /// The order this callback confirms.
    pub order_id: String,

    /// Gateway-assigned transaction id; idempotency key for applying the
    /// purchase.
    pub provider_txn_id: String,

    /// User the purchase belongs to.
    pub user_id: UserId,

    /// Plan code that was purchased.
    pub plan_code: String,

    /// Amount actually charged, in VND.
    pub amount: i64,

    /// When the gateway confirmed the charge.
    pub paid_at: Timestamp,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create an invalid order error.
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidOrder, message)
    }

    /// Create an invalid callback error (bad signature, stale timestamp,
    /// malformed payload).
    pub fn invalid_callback(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidCallback, message)
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::InvalidCallback => ErrorCode::InvalidSignature,
            PaymentErrorCode::RateLimitExceeded => ErrorCode::RateLimited,
            _ => ErrorCode::PaymentProviderError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed (bad merchant credentials).
    AuthenticationError,

    /// Order request rejected by the gateway.
    InvalidOrder,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Callback verification failed.
    InvalidCallback,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidOrder => "invalid_order",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidCallback => "invalid_callback",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
