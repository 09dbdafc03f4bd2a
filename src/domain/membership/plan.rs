//! Membership plan catalog.
//!
//! Plans are the purchasable packaging of tiers: a stable code, a marketing
//! name, a price in VND, and the period a purchase buys. The catalog is
//! static; changing it is a deploy, not a data migration.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::MembershipTier;

/// A purchasable (or default) membership plan.
///
/// # Plan Catalog
///
/// | Code | Name | Tier | Price (VND) | Duration |
/// |------|------|------|-------------|----------|
/// | basic_free | Basic Free | free | 0 | open-ended |
/// | premium_monthly | Premium Monthly | premium | 99,000 | 30 days |
/// | pro_plan | NoSmoke Pro Plan | pro | 199,000 | 30 days |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPlan {
    /// Stable identifier used in upgrade requests and payment orders.
    pub code: &'static str,
    /// Display name shown to users and passed to the payment gateway.
    pub name: &'static str,
    /// Tier a purchase of this plan grants.
    pub tier: MembershipTier,
    /// Price in VND. Zero for the free plan.
    pub price: i64,
    /// Length of the paid period in days. Zero means open-ended.
    pub duration_days: u32,
}

static CATALOG: Lazy<Vec<MembershipPlan>> = Lazy::new(|| {
    vec![
        MembershipPlan {
            code: "basic_free",
            name: "Basic Free",
            tier: MembershipTier::Free,
            price: 0,
            duration_days: 0,
        },
        MembershipPlan {
            code: "premium_monthly",
            name: "Premium Monthly",
            tier: MembershipTier::Premium,
            price: 99_000,
            duration_days: 30,
        },
        MembershipPlan {
            code: "pro_plan",
            name: "NoSmoke Pro Plan",
            tier: MembershipTier::Pro,
            price: 199_000,
            duration_days: 30,
        },
    ]
});

impl MembershipPlan {
    /// Looks up a plan by its stable code.
    pub fn by_code(code: &str) -> Option<&'static MembershipPlan> {
        CATALOG.iter().find(|plan| plan.code == code)
    }

    /// All plans, free first, then ascending by tier.
    pub fn all() -> &'static [MembershipPlan] {
        &CATALOG
    }

    /// Whether the plan can be bought. Free plans are assigned, never sold.
    pub fn is_purchasable(&self) -> bool {
        self.tier.is_paid()
    }
}
