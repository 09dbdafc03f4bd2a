//! Access requirements and the access evaluator.
//!
//! An `AccessRequirement` names the tiers a protected resource accepts; the
//! minimum of that set is the effective floor. Both gates (HTTP middleware and
//! the client guard) evaluate through this type so the decision logic exists
//! exactly once.

use serde::{Deserialize, Serialize};

use super::MembershipTier;

/// The set of tiers a protected resource accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    allowed: Vec<MembershipTier>,
}

impl AccessRequirement {
    /// Creates a requirement from a set of acceptable tiers.
    ///
    /// Duplicates are collapsed. An empty set has no floor and denies
    /// every tier.
    pub fn new(tiers: impl IntoIterator<Item = MembershipTier>) -> Self {
        let mut allowed: Vec<MembershipTier> = Vec::new();
        for tier in tiers {
            if !allowed.contains(&tier) {
                allowed.push(tier);
            }
        }
        allowed.sort_by_key(|t| t.rank());
        Self { allowed }
    }

    /// Creates a requirement with a single minimum tier.
    pub fn at_least(tier: MembershipTier) -> Self {
        Self::new([tier])
    }

    /// The tiers this requirement accepts, in ascending order.
    pub fn allowed(&self) -> &[MembershipTier] {
        &self.allowed
    }

    /// The effective floor: the minimum of the accepted set.
    ///
    /// `None` for an empty requirement, which denies everything.
    pub fn required_tier(&self) -> Option<MembershipTier> {
        self.allowed.first().copied()
    }

    /// The access evaluator: does `tier` meet this requirement?
    ///
    /// Pure and infallible. `tier >= min(allowed)` in the tier order; the
    /// caller is responsible for having already coerced unknown input to
    /// `Free`.
    pub fn grants(&self, tier: MembershipTier) -> bool {
        match self.required_tier() {
            Some(minimum) => tier.is_at_least(minimum),
            None => false,
        }
    }

    /// Evaluates `tier` and returns a decision carrying denial context.
    pub fn evaluate(&self, tier: MembershipTier) -> AccessDecision {
        if self.grants(tier) {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied(DeniedAccess {
                current: tier,
                required: self.required_tier(),
            })
        }
    }
}

/// Outcome of an access evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(DeniedAccess),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// Context for a denied evaluation: what the caller has and what is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedAccess {
    /// The tier the principal currently holds (effective, post-expiry).
    pub current: MembershipTier,

    /// The minimum tier that would be granted, if the requirement is
    /// satisfiable at all.
    pub required: Option<MembershipTier>,
}

impl DeniedAccess {
    /// Whether an upgrade prompt applies: only free users are offered one.
    pub fn can_upgrade(&self) -> bool {
        self.current == MembershipTier::Free
    }
}
