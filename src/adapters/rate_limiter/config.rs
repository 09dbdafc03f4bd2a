//! Rate limit configuration types.
//!
//! Defines the configuration for rate limiting across different scopes
//! and membership tiers.

use crate::domain::membership::MembershipTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete rate limit configuration.
///
/// Contains limits for global, per-IP, and per-tier rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Global rate limits (infrastructure protection).
    pub global: GlobalLimits,
    /// Per-IP rate limits (brute-force protection).
    pub per_ip: IpLimits,
    /// Per-tier rate limits (tier-based quotas).
    pub per_tier: HashMap<MembershipTier, TierRateLimits>,
    /// Per-resource rate limits (specific endpoint limits).
    pub resources: HashMap<String, ResourceLimits>,
}

/// Global rate limits for infrastructure protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalLimits {
    /// Maximum requests per minute globally.
    pub requests_per_minute: u32,
}

/// Per-IP rate limits for brute-force protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpLimits {
    /// Maximum requests per minute per IP.
    pub requests_per_minute: u32,
    /// Maximum authentication attempts per hour per IP.
    pub auth_attempts_per_hour: u32,
}

/// Rate limits for a specific membership tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRateLimits {
    /// General API requests per minute.
    pub general_requests_per_minute: u32,
    /// Feature access checks per minute.
    pub access_checks_per_minute: u32,
    /// Membership purchase orders per hour.
    pub membership_upgrades_per_hour: u32,
}

/// Rate limits for a specific resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum requests per window.
    pub requests_per_window: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut per_tier = HashMap::new();
        per_tier.insert(MembershipTier::Free, TierRateLimits::free());
        per_tier.insert(MembershipTier::Premium, TierRateLimits::premium());
        per_tier.insert(MembershipTier::Pro, TierRateLimits::pro());

        let mut resources = HashMap::new();
        // The payment callback endpoint is unauthenticated, so it gets its
        // own window instead of a per-user quota.
        resources.insert(
            "payment_callback".to_string(),
            ResourceLimits {
                requests_per_window: 120,
                window_secs: 60,
            },
        );

        Self {
            global: GlobalLimits {
                requests_per_minute: 10_000,
            },
            per_ip: IpLimits {
                requests_per_minute: 100,
                auth_attempts_per_hour: 10,
            },
            per_tier,
            resources,
        }
    }
}

impl TierRateLimits {
    /// Returns rate limits for the Free tier.
    pub fn free() -> Self {
        Self {
            general_requests_per_minute: 60,
            access_checks_per_minute: 30,
            membership_upgrades_per_hour: 5,
        }
    }

    /// Returns rate limits for the Premium tier.
    pub fn premium() -> Self {
        Self {
            general_requests_per_minute: 120,
            access_checks_per_minute: 120,
            membership_upgrades_per_hour: 10,
        }
    }

    /// Returns rate limits for the Pro tier.
    pub fn pro() -> Self {
        Self {
            general_requests_per_minute: 300,
            access_checks_per_minute: 300,
            membership_upgrades_per_hour: 20,
        }
    }

    /// Get the limit and window for a specific resource.
    ///
    /// Returns (limit, window_secs) tuple.
    pub fn limit_for_resource(&self, resource: Option<&str>) -> (u32, u32) {
        match resource {
            Some("check_access") => (self.access_checks_per_minute, 60),
            Some("membership_upgrade") => (self.membership_upgrades_per_hour, 3600),
            _ => (self.general_requests_per_minute, 60),
        }
    }
}

impl RateLimitConfig {
    /// Get the limits for a specific tier.
    ///
    /// Falls back to Free tier if tier not found.
    pub fn limits_for_tier(&self, tier: MembershipTier) -> &TierRateLimits {
        self.per_tier
            .get(&tier)
            .or_else(|| self.per_tier.get(&MembershipTier::Free))
            .expect("Free tier should always exist")
    }
}
