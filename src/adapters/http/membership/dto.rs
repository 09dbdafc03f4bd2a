//! HTTP DTOs (Data Transfer Objects) for membership endpoints.
//!
//! These types define the JSON request/response structure for the membership
//! API. They serve as the boundary between HTTP and the application layer.
//!
//! Tier values arriving from clients are lenient: unrecognized strings coerce
//! to the free tier instead of failing the request.

use crate::domain::foundation::UserId;
use crate::domain::membership::{AccessRequirement, MembershipStatus, MembershipTier};
use crate::ports::MembershipView;
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to check access to a gated feature.
///
/// This endpoint's wire contract is camelCase.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFeatureAccessRequest {
    /// Tiers that may use the feature. Unknown tier strings coerce to free.
    pub allowed_memberships: Vec<String>,
}

impl CheckFeatureAccessRequest {
    /// Convert the raw tier strings into a requirement.
    pub fn to_requirement(&self) -> AccessRequirement {
        AccessRequirement::new(
            self.allowed_memberships
                .iter()
                .map(|s| MembershipTier::from_str_lenient(s)),
        )
    }
}

/// Request to start a paid upgrade.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeMembershipRequest {
    /// Catalog code of the plan to purchase.
    pub plan_code: String,
}

/// Request to cancel a membership.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelMembershipRequest {
    /// Optional free-form cancellation reason.
    #[serde(default)]
    pub reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Membership details for the authenticated user.
///
/// Users without a membership row receive a synthesized free-tier payload
/// with `registered: false`, so clients never have to special-case absence.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipDetailsResponse {
    /// Whether a membership row exists for this user.
    pub registered: bool,
    /// Membership ID, absent for synthesized payloads.
    pub id: Option<String>,
    /// User ID.
    pub user_id: String,
    /// Effective tier (expiry already reconciled).
    pub tier: MembershipTier,
    /// Current status.
    pub status: MembershipStatus,
    /// Whether a paid period has lapsed.
    pub is_expired: bool,
    /// When the membership started (ISO 8601).
    pub started_at: Option<String>,
    /// When paid access ends (ISO 8601), null for free tier.
    pub expires_at: Option<String>,
    /// Whole days of paid access remaining.
    pub days_remaining: u32,
    /// When the record was created (ISO 8601).
    pub created_at: Option<String>,
}

impl MembershipDetailsResponse {
    /// Build the payload for a user with no membership row.
    pub fn synthesized_free(user_id: &UserId) -> Self {
        Self {
            registered: false,
            id: None,
            user_id: user_id.to_string(),
            tier: MembershipTier::Free,
            status: MembershipStatus::Active,
            is_expired: false,
            started_at: None,
            expires_at: None,
            days_remaining: 0,
            created_at: None,
        }
    }
}

impl From<MembershipView> for MembershipDetailsResponse {
    fn from(view: MembershipView) -> Self {
        Self {
            registered: true,
            id: Some(view.id.to_string()),
            user_id: view.user_id.to_string(),
            tier: view.tier,
            status: view.status,
            is_expired: view.is_expired,
            started_at: Some(view.started_at.as_datetime().to_rfc3339()),
            expires_at: view.expires_at.map(|t| t.as_datetime().to_rfc3339()),
            days_remaining: view.days_remaining,
            created_at: Some(view.created_at.as_datetime().to_rfc3339()),
        }
    }
}

/// Response for the feature access check (camelCase wire contract).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFeatureAccessResponse {
    /// Whether the caller may use the feature.
    pub has_access: bool,
    /// The caller's effective tier (free for anonymous callers).
    pub user_membership: MembershipTier,
    /// Minimum tier that would grant access, null for an empty requirement.
    pub required_membership: Option<MembershipTier>,
}

/// Response for upgrade initiation.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeResponse {
    /// Gateway order identifier.
    pub order_id: String,
    /// URL the user completes payment at.
    pub order_url: String,
}

/// Response for a successful cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// The status after cancellation (always cancelled).
    pub status: MembershipStatus,
    /// When paid access runs out (ISO 8601), null for free records.
    pub access_until: Option<String>,
}

/// Acknowledgement body in the payment gateway's format.
///
/// `return_code` semantics: 1 = applied (or already applied), -1 = permanent
/// failure (stop redelivering), 0 = transient failure (redeliver later).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAckResponse {
    pub return_code: i32,
    pub return_message: String,
}

impl CallbackAckResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            return_code: 1,
            return_message: message.into(),
        }
    }

    pub fn permanent_failure(message: impl Into<String>) -> Self {
        Self {
            return_code: -1,
            return_message: message.into(),
        }
    }

    pub fn transient_failure(message: impl Into<String>) -> Self {
        Self {
            return_code: 0,
            return_message: message.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details.
    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MembershipId, Timestamp};

    // ════════════════════════════════════════════════════════════════════════════
    // Request DTO Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn check_feature_access_request_deserializes_camel_case() {
        let json = r#"{"allowedMemberships": ["premium", "pro"]}"#;
        let request: CheckFeatureAccessRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.allowed_memberships, vec!["premium", "pro"]);
    }

    #[test]
    fn check_feature_access_request_builds_requirement() {
        let request = CheckFeatureAccessRequest {
            allowed_memberships: vec!["pro".to_string(), "premium".to_string()],
        };
        let requirement = request.to_requirement();
        assert_eq!(requirement.required_tier(), Some(MembershipTier::Premium));
    }

    #[test]
    fn check_feature_access_request_coerces_unknown_tiers_to_free() {
        let request = CheckFeatureAccessRequest {
            allowed_memberships: vec!["platinum".to_string()],
        };
        let requirement = request.to_requirement();
        assert_eq!(requirement.required_tier(), Some(MembershipTier::Free));
    }

    #[test]
    fn upgrade_request_deserializes() {
        let json = r#"{"plan_code": "premium_monthly"}"#;
        let request: UpgradeMembershipRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.plan_code, "premium_monthly");
    }

    #[test]
    fn cancel_request_defaults_reason_to_none() {
        let json = r#"{}"#;
        let request: CancelMembershipRequest = serde_json::from_str(json).unwrap();
        assert!(request.reason.is_none());
    }

    #[test]
    fn cancel_request_parses_reason() {
        let json = r#"{"reason": "quit smoking, quitting the app too"}"#;
        let request: CancelMembershipRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.reason.as_deref(),
            Some("quit smoking, quitting the app too")
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response DTO Tests
    // ════════════════════════════════════════════════════════════════════════════

    fn test_view() -> MembershipView {
        let now = Timestamp::now();
        MembershipView {
            id: MembershipId::new(),
            user_id: UserId::new("user-123").unwrap(),
            tier: MembershipTier::Premium,
            status: MembershipStatus::Active,
            is_expired: false,
            started_at: now,
            expires_at: Some(now.add_days(30)),
            days_remaining: 30,
            created_at: now,
        }
    }

    #[test]
    fn details_response_from_view() {
        let view = test_view();
        let response = MembershipDetailsResponse::from(view.clone());

        assert!(response.registered);
        assert_eq!(response.id, Some(view.id.to_string()));
        assert_eq!(response.tier, MembershipTier::Premium);
        assert_eq!(response.days_remaining, 30);
        assert!(response.expires_at.is_some());
    }

    #[test]
    fn synthesized_free_payload_has_no_row_fields() {
        let user_id = UserId::new("user-123").unwrap();
        let response = MembershipDetailsResponse::synthesized_free(&user_id);

        assert!(!response.registered);
        assert!(response.id.is_none());
        assert_eq!(response.user_id, "user-123");
        assert_eq!(response.tier, MembershipTier::Free);
        assert_eq!(response.status, MembershipStatus::Active);
        assert_eq!(response.days_remaining, 0);
        assert!(response.expires_at.is_none());
    }

    #[test]
    fn check_feature_access_response_serializes_camel_case() {
        let response = CheckFeatureAccessResponse {
            has_access: false,
            user_membership: MembershipTier::Free,
            required_membership: Some(MembershipTier::Premium),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"hasAccess":false,"userMembership":"free","requiredMembership":"premium"}"#
        );
    }

    #[test]
    fn check_feature_access_response_serializes_null_requirement() {
        let response = CheckFeatureAccessResponse {
            has_access: false,
            user_membership: MembershipTier::Pro,
            required_membership: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""requiredMembership":null"#));
    }

    #[test]
    fn callback_ack_codes() {
        assert_eq!(CallbackAckResponse::success("ok").return_code, 1);
        assert_eq!(CallbackAckResponse::permanent_failure("no").return_code, -1);
        assert_eq!(CallbackAckResponse::transient_failure("later").return_code, 0);
    }

    #[test]
    fn callback_ack_serializes_gateway_fields() {
        let ack = CallbackAckResponse::success("success");
        let json = serde_json::to_string(&ack).unwrap();
        assert_eq!(json, r#"{"return_code":1,"return_message":"success"}"#);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Response Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn error_response_new_creates_response() {
        let response = ErrorResponse::new("VALIDATION_FAILED", "Unknown plan");
        assert_eq!(response.error_code, "VALIDATION_FAILED");
        assert_eq!(response.message, "Unknown plan");
        assert!(response.details.is_none());
    }

    #[test]
    fn error_response_serializes_without_details_when_none() {
        let response = ErrorResponse::new("MEMBERSHIP_NOT_FOUND", "Not found");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn error_response_serializes_with_details_when_present() {
        let details = serde_json::json!({"field": "plan_code"});
        let response = ErrorResponse::with_details("VALIDATION_FAILED", "Invalid", details);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("details"));
    }
}
