//! Tier gate middleware for premium routes.
//!
//! The gate sits behind `auth_middleware` and decides whether the caller's
//! effective membership tier clears a route's requirement. It never mutates
//! membership state; lapsed paid tiers have already been reconciled to free
//! by the reader.
//!
//! ```text
//! Request → auth_middleware → membership_gate_middleware → handler
//!                                      ↓ (tier too low)
//!                              403 with current and required tier
//! ```
//!
//! # Example
//!
//! ```ignore
//! let gate = Arc::new(MembershipGate::new(
//!     reader.clone(),
//!     AccessRequirement::at_least(MembershipTier::Premium),
//! ));
//!
//! let premium_routes = Router::new()
//!     .route("/api/reports/export", post(export_report))
//!     .layer(middleware::from_fn_with_state(gate, membership_gate_middleware));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::membership::dto::ErrorResponse;
use crate::domain::foundation::{AuthenticatedUser, ErrorCode};
use crate::domain::membership::{AccessDecision, AccessRequirement, DeniedAccess, MembershipTier};
use crate::ports::MembershipReader;

/// Gate state: the requirement a route carries and where to look up the
/// caller's effective tier.
#[derive(Clone)]
pub struct MembershipGate {
    reader: Arc<dyn MembershipReader>,
    requirement: AccessRequirement,
}

impl MembershipGate {
    /// Creates a gate for an arbitrary requirement.
    pub fn new(reader: Arc<dyn MembershipReader>, requirement: AccessRequirement) -> Self {
        Self {
            reader,
            requirement,
        }
    }

    /// Creates a gate that admits premium and above.
    pub fn premium(reader: Arc<dyn MembershipReader>) -> Self {
        Self::new(reader, AccessRequirement::at_least(MembershipTier::Premium))
    }

    /// Evaluates the gate for an (optionally absent) authenticated user.
    ///
    /// Returns the caller's effective tier on success so handlers behind the
    /// gate can reuse it without a second lookup.
    pub async fn check(
        &self,
        user: Option<&AuthenticatedUser>,
    ) -> Result<MembershipTier, GateRejection> {
        let user = user.ok_or(GateRejection::Unauthenticated)?;

        let tier = self.reader.get_tier(&user.id).await.map_err(|e| {
            tracing::error!(user_id = %user.id, "Tier lookup failed during gate check: {}", e);
            GateRejection::Unavailable
        })?;

        match self.requirement.evaluate(tier) {
            AccessDecision::Granted => Ok(tier),
            AccessDecision::Denied(denied) => Err(GateRejection::Denied(denied)),
        }
    }
}

/// Middleware that rejects requests whose tier does not clear the gate.
///
/// Reads the `AuthenticatedUser` that `auth_middleware` put into request
/// extensions. Anonymous requests get 401; authenticated requests below the
/// required tier get 403 with a payload naming both tiers.
pub async fn membership_gate_middleware(
    State(gate): State<Arc<MembershipGate>>,
    request: Request,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>().cloned();

    match gate.check(user.as_ref()).await {
        Ok(_) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// Why the gate turned a request away.
#[derive(Debug, Clone)]
pub enum GateRejection {
    /// No authenticated user on the request.
    Unauthenticated,
    /// The caller's tier does not satisfy the requirement.
    Denied(DeniedAccess),
    /// The tier lookup failed; access cannot be decided.
    Unavailable,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    ErrorCode::Unauthenticated.to_string(),
                    "Authentication required",
                )),
            )
                .into_response(),
            GateRejection::Denied(denied) => {
                let message = match denied.required {
                    Some(required) => {
                        format!("This feature requires a {} membership", required.as_str())
                    }
                    None => "This feature is not available for your membership".to_string(),
                };

                let details = serde_json::json!({
                    "current_tier": denied.current.as_str(),
                    "required_tier": denied.required.map(|t| t.as_str()),
                    "can_upgrade": denied.can_upgrade(),
                });

                (
                    StatusCode::FORBIDDEN,
                    Json(ErrorResponse::with_details(
                        ErrorCode::Forbidden.to_string(),
                        message,
                        details,
                    )),
                )
                    .into_response()
            }
            GateRejection::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    ErrorCode::InternalError.to_string(),
                    "Unable to verify membership access",
                )),
            )
                .into_response(),
        }
    }
}
