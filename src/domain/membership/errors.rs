//! Membership-specific error types.
//!
//! Errors related to membership lifecycle, plan lookup, payment processing,
//! and callback verification.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | AlreadyExists | 409 |
//! | InvalidTier | 400 |
//! | InvalidPlan | 400 |
//! | PaymentFailed | 402 |
//! | InvalidState | 409 |
//! | InvalidCallbackSignature | 401 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, MembershipId, UserId};

/// Membership-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// Membership was not found.
    NotFound(MembershipId),

    /// No membership exists for this user.
    NotFoundForUser(UserId),

    /// User already has a membership record.
    AlreadyExists(UserId),

    /// Invalid membership tier specified.
    InvalidTier(String),

    /// Plan code does not exist in the catalog, or is not purchasable.
    InvalidPlan(String),

    /// Payment gateway call failed.
    PaymentFailed {
        reason: String,
    },

    /// Invalid state for the requested operation.
    InvalidState {
        current: String,
        attempted: String,
    },

    /// Payment callback signature verification failed.
    InvalidCallbackSignature,

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl MembershipError {
    // Constructor functions for cleaner error creation

    pub fn not_found(id: MembershipId) -> Self {
        MembershipError::NotFound(id)
    }

    pub fn not_found_for_user(user_id: UserId) -> Self {
        MembershipError::NotFoundForUser(user_id)
    }

    pub fn already_exists(user_id: UserId) -> Self {
        MembershipError::AlreadyExists(user_id)
    }

    pub fn invalid_tier(tier: impl Into<String>) -> Self {
        MembershipError::InvalidTier(tier.into())
    }

    pub fn invalid_plan(code: impl Into<String>) -> Self {
        MembershipError::InvalidPlan(code.into())
    }

    pub fn payment_failed(reason: impl Into<String>) -> Self {
        MembershipError::PaymentFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        MembershipError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn invalid_callback_signature() -> Self {
        MembershipError::InvalidCallbackSignature
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MembershipError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MembershipError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MembershipError::NotFound(_) | MembershipError::NotFoundForUser(_) => {
                ErrorCode::MembershipNotFound
            }
            MembershipError::AlreadyExists(_) => ErrorCode::MembershipExists,
            MembershipError::InvalidTier(_) => ErrorCode::InvalidTier,
            MembershipError::InvalidPlan(_) => ErrorCode::PlanNotFound,
            MembershipError::PaymentFailed { .. } => ErrorCode::PaymentProviderError,
            MembershipError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            MembershipError::InvalidCallbackSignature => ErrorCode::InvalidSignature,
            MembershipError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MembershipError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            MembershipError::NotFound(id) => format!("Membership not found: {}", id),
            MembershipError::NotFoundForUser(user_id) => {
                format!("No membership found for user: {}", user_id)
            }
            MembershipError::AlreadyExists(user_id) => {
                format!("User {} already has a membership", user_id)
            }
            MembershipError::InvalidTier(tier) => format!("Invalid membership tier: {}", tier),
            MembershipError::InvalidPlan(code) => format!("Unknown membership plan: {}", code),
            MembershipError::PaymentFailed { reason } => format!("Payment failed: {}", reason),
            MembershipError::InvalidState { current, attempted } => {
                format!("Cannot {} membership in {} state", attempted, current)
            }
            MembershipError::InvalidCallbackSignature => {
                "Invalid payment callback signature".to_string()
            }
            MembershipError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            MembershipError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MembershipError::Infrastructure(_) | MembershipError::PaymentFailed { .. }
        )
    }
}

impl std::fmt::Display for MembershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MembershipError {}

impl From<DomainError> for MembershipError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidTier => MembershipError::InvalidTier(err.to_string()),
            ErrorCode::PlanNotFound => MembershipError::InvalidPlan(err.to_string()),
            ErrorCode::PaymentProviderError => MembershipError::PaymentFailed {
                reason: err.to_string(),
            },
            ErrorCode::InvalidStateTransition => MembershipError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.to_string(),
            },
            ErrorCode::InvalidSignature => MembershipError::InvalidCallbackSignature,
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                MembershipError::ValidationFailed {
                    field: "unknown".to_string(),
                    message: err.to_string(),
                }
            }
            _ => MembershipError::Infrastructure(err.to_string()),
        }
    }
}

impl From<MembershipError> for DomainError {
    fn from(err: MembershipError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
