//! HTTP handlers for membership endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. Authentication is handled by the bearer-token middleware; the
//! `RequireAuth`/`OptionalAuth` extractors read the validated principal from
//! request extensions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::middleware::{OptionalAuth, RequireAuth};
use crate::application::handlers::membership::{
    ApplyPaymentCallbackCommand, ApplyPaymentCallbackHandler, ApplyPaymentCallbackResult,
    CancelMembershipCommand, CancelMembershipHandler, CheckFeatureAccessHandler,
    CheckFeatureAccessQuery, GetMembershipHandler, GetMembershipQuery, RegisterMembershipCommand,
    RegisterMembershipHandler, UpgradeMembershipCommand, UpgradeMembershipHandler,
};
use crate::domain::foundation::Timestamp;
use crate::domain::membership::MembershipError;
use crate::ports::{
    EventPublisher, MembershipReader, MembershipRepository, MembershipView, PaymentProvider,
};

use super::dto::{
    CallbackAckResponse, CancelMembershipRequest, CancelResponse, CheckFeatureAccessRequest,
    CheckFeatureAccessResponse, ErrorResponse, MembershipDetailsResponse,
    UpgradeMembershipRequest, UpgradeResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct MembershipAppState {
    pub membership_repository: Arc<dyn MembershipRepository>,
    pub membership_reader: Arc<dyn MembershipReader>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

impl MembershipAppState {
    /// Create handlers on demand from the shared state.
    pub fn get_membership_handler(&self) -> GetMembershipHandler {
        GetMembershipHandler::new(self.membership_reader.clone())
    }

    pub fn check_feature_access_handler(&self) -> CheckFeatureAccessHandler {
        CheckFeatureAccessHandler::new(self.membership_reader.clone())
    }

    pub fn register_membership_handler(&self) -> RegisterMembershipHandler {
        RegisterMembershipHandler::new(
            self.membership_repository.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn upgrade_membership_handler(&self) -> UpgradeMembershipHandler {
        UpgradeMembershipHandler::new(
            self.membership_reader.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn cancel_membership_handler(&self) -> CancelMembershipHandler {
        CancelMembershipHandler::new(
            self.membership_repository.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn apply_payment_callback_handler(&self) -> ApplyPaymentCallbackHandler {
        ApplyPaymentCallbackHandler::new(
            self.membership_repository.clone(),
            self.payment_provider.clone(),
            self.event_publisher.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/membership - Get current user's membership details.
///
/// Users without a membership row receive a synthesized free-tier payload.
pub async fn get_membership(
    State(state): State<MembershipAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, MembershipApiError> {
    let handler = state.get_membership_handler();
    let query = GetMembershipQuery {
        user_id: user.id.clone(),
    };

    let result = handler.handle(query).await?;

    let response = match result {
        Some(view) => MembershipDetailsResponse::from(view),
        None => MembershipDetailsResponse::synthesized_free(&user.id),
    };

    Ok(Json(response))
}

/// POST /api/membership/check-feature-access - Check access to a gated feature.
///
/// Works for anonymous callers too: they are evaluated as unregistered free
/// users and receive a denial payload, never an auth error.
pub async fn check_feature_access(
    State(state): State<MembershipAppState>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CheckFeatureAccessRequest>,
) -> Result<impl IntoResponse, MembershipApiError> {
    let handler = state.check_feature_access_handler();
    let query = CheckFeatureAccessQuery {
        user_id: user.map(|u| u.id),
        requirement: request.to_requirement(),
    };

    let result = handler.handle(query).await?;

    let response = CheckFeatureAccessResponse {
        has_access: result.has_access,
        user_membership: result.user_tier,
        required_membership: result.required_tier,
    };

    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/membership - Register a free membership for the current user.
pub async fn register_membership(
    State(state): State<MembershipAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, MembershipApiError> {
    let handler = state.register_membership_handler();
    let cmd = RegisterMembershipCommand { user_id: user.id };

    let result = handler.handle(cmd).await?;

    let now = Timestamp::now();
    let view = MembershipView {
        id: result.membership.id.clone(),
        user_id: result.membership.user_id.clone(),
        tier: result.membership.effective_tier(now),
        status: result.membership.status,
        is_expired: result.membership.is_expired(now),
        started_at: result.membership.started_at,
        expires_at: result.membership.expires_at,
        days_remaining: result.membership.days_remaining(now),
        created_at: result.membership.created_at,
    };

    Ok((
        StatusCode::CREATED,
        Json(MembershipDetailsResponse::from(view)),
    ))
}

/// POST /api/membership/upgrade - Start a paid upgrade.
///
/// Creates a gateway payment order; the membership itself only changes when
/// the gateway's callback confirms the charge.
pub async fn upgrade_membership(
    State(state): State<MembershipAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<UpgradeMembershipRequest>,
) -> Result<impl IntoResponse, MembershipApiError> {
    let handler = state.upgrade_membership_handler();
    let cmd = UpgradeMembershipCommand {
        user_id: user.id,
        plan_code: request.plan_code,
    };

    let result = handler.handle(cmd).await?;

    let response = UpgradeResponse {
        order_id: result.order.order_id,
        order_url: result.order.order_url,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/membership/cancel - Cancel membership.
///
/// Paid access continues until the already-purchased period expires.
pub async fn cancel_membership(
    State(state): State<MembershipAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CancelMembershipRequest>,
) -> Result<impl IntoResponse, MembershipApiError> {
    let handler = state.cancel_membership_handler();
    let cmd = CancelMembershipCommand {
        user_id: user.id,
        reason: request.reason,
    };

    let result = handler.handle(cmd).await?;

    let response = CancelResponse {
        status: result.membership.status,
        access_until: result
            .access_until
            .map(|t| t.as_datetime().to_rfc3339()),
    };

    Ok(Json(response))
}

/// POST /api/payments/zalopay/callback - Handle gateway payment callbacks.
///
/// No user auth; the callback is authenticated by its HMAC signature. The
/// response is always HTTP 200 with the gateway's acknowledgement format:
/// non-success outcomes are reported through `return_code` so the gateway
/// knows whether to redeliver.
pub async fn zalopay_callback(
    State(state): State<MembershipAppState>,
    body: Bytes,
) -> Json<CallbackAckResponse> {
    let handler = state.apply_payment_callback_handler();
    let cmd = ApplyPaymentCallbackCommand {
        body: body.to_vec(),
    };

    let ack = match handler.handle(cmd).await {
        Ok(ApplyPaymentCallbackResult::Applied { membership }) => {
            tracing::info!(
                membership_id = %membership.id,
                tier = %membership.tier.as_str(),
                "payment callback applied"
            );
            CallbackAckResponse::success("success")
        }
        Ok(ApplyPaymentCallbackResult::AlreadyApplied { provider_txn_id }) => {
            tracing::info!(%provider_txn_id, "payment callback redelivered, already applied");
            CallbackAckResponse::success("transaction already applied")
        }
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "payment callback failed, gateway will retry");
            CallbackAckResponse::transient_failure("temporary failure")
        }
        Err(e) => {
            tracing::warn!(error = %e, "payment callback rejected");
            CallbackAckResponse::permanent_failure(e.message())
        }
    };

    Json(ack)
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
pub struct MembershipApiError(MembershipError);

impl From<MembershipError> for MembershipApiError {
    fn from(err: MembershipError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for MembershipApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(MembershipError::from(err))
    }
}

impl IntoResponse for MembershipApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            MembershipError::NotFound(_) | MembershipError::NotFoundForUser(_) => {
                StatusCode::NOT_FOUND
            }
            MembershipError::AlreadyExists(_) => StatusCode::CONFLICT,
            MembershipError::InvalidTier(_) | MembershipError::InvalidPlan(_) => {
                StatusCode::BAD_REQUEST
            }
            MembershipError::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
            MembershipError::InvalidState { .. } => StatusCode::CONFLICT,
            MembershipError::InvalidCallbackSignature => StatusCode::UNAUTHORIZED,
            MembershipError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            MembershipError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
