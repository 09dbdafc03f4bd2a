//! HTTP client for the membership API.
//!
//! The client side of the service talks to the backend exclusively through
//! the [`MembershipApi`] trait, so the state store and feature gate can be
//! tested against a mock without a network.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::snapshot::MembershipSnapshot;
use crate::domain::foundation::Timestamp;
use crate::domain::membership::MembershipTier;

/// Backend membership API as seen from the client.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Fetch the authenticated user's current membership.
    async fn fetch_membership(&self) -> Result<MembershipPayload, ApiError>;

    /// Ask the backend whether the user may use a feature gated to `allowed`.
    async fn check_feature_access(
        &self,
        allowed: &[MembershipTier],
    ) -> Result<AccessCheckPayload, ApiError>;

    /// Start a paid upgrade for the given plan code.
    async fn start_upgrade(&self, plan_code: &str) -> Result<UpgradeOrder, ApiError>;
}

/// Membership details as delivered by `GET /api/membership`.
///
/// Every field is optional with a default so the client tolerates both
/// current payloads (explicit `tier` code) and older ones that only carry
/// a `membershipType` package name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MembershipPayload {
    /// Whether a membership row exists server-side.
    #[serde(default)]
    pub registered: bool,
    /// Membership row id.
    #[serde(default)]
    pub id: Option<String>,
    /// Explicit tier code, the preferred signal.
    #[serde(default)]
    pub tier: Option<String>,
    /// Human-readable package name on payloads predating the tier code.
    #[serde(default, rename = "membershipType")]
    pub membership_type: Option<String>,
    /// Current status string.
    #[serde(default)]
    pub status: Option<String>,
    /// When paid access ends (ISO 8601).
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Whole days of paid access remaining.
    #[serde(default)]
    pub days_remaining: Option<u32>,
}

impl MembershipPayload {
    /// Project this payload into the persisted snapshot shape.
    pub fn to_snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot {
            id: self.id.clone(),
            membership: self.tier.clone(),
            membership_type: self.membership_type.clone(),
            refreshed_at: Some(Timestamp::now()),
        }
    }
}

/// Outcome of the backend feature access check (camelCase wire contract).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckPayload {
    /// Whether the caller may use the feature.
    pub has_access: bool,
    /// The caller's effective tier.
    pub user_membership: MembershipTier,
    /// Minimum tier that would grant access.
    #[serde(default)]
    pub required_membership: Option<MembershipTier>,
}

/// A created payment order the user completes in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpgradeOrder {
    /// Gateway order identifier.
    pub order_id: String,
    /// URL the user completes payment at.
    pub order_url: String,
}

/// Errors surfaced by the client-side API calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The session token was missing, expired or rejected.
    #[error("not authenticated")]
    Unauthenticated,

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request never reached the backend.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckAccessBody<'a> {
    allowed_memberships: &'a [MembershipTier],
}

#[derive(Serialize)]
struct UpgradeBody<'a> {
    plan_code: &'a str,
}

/// [`MembershipApi`] implementation over HTTP with a bearer session token.
pub struct HttpMembershipApi {
    base_url: String,
    token: SecretString,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpMembershipApi {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a client for the given backend base URL and session token.
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http_client: reqwest::Client::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MembershipApi for HttpMembershipApi {
    async fn fetch_membership(&self) -> Result<MembershipPayload, ApiError> {
        let response = self
            .http_client
            .get(self.url("/api/membership"))
            .bearer_auth(self.token.expose_secret())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        decode_response(response).await
    }

    async fn check_feature_access(
        &self,
        allowed: &[MembershipTier],
    ) -> Result<AccessCheckPayload, ApiError> {
        let response = self
            .http_client
            .post(self.url("/api/membership/check-feature-access"))
            .bearer_auth(self.token.expose_secret())
            .timeout(self.timeout)
            .json(&CheckAccessBody {
                allowed_memberships: allowed,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        decode_response(response).await
    }

    async fn start_upgrade(&self, plan_code: &str) -> Result<UpgradeOrder, ApiError> {
        let response = self
            .http_client
            .post(self.url("/api/membership/upgrade"))
            .bearer_auth(self.token.expose_secret())
            .timeout(self.timeout)
            .json(&UpgradeBody { plan_code })
            .send()
            .await
            .map_err(map_transport_error)?;

        decode_response(response).await
    }
}

impl std::fmt::Debug for HttpMembershipApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMembershipApi")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthenticated);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
