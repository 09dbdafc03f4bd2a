//! CheckFeatureAccessHandler - Query handler for feature access checks.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::membership::{AccessRequirement, MembershipError, MembershipTier};
use crate::ports::MembershipReader;

/// Query asking whether a principal may use a feature.
///
/// `user_id` is `None` for unauthenticated callers; the check still answers
/// with a denial payload instead of an error.
#[derive(Debug, Clone)]
pub struct CheckFeatureAccessQuery {
    pub user_id: Option<UserId>,
    pub requirement: AccessRequirement,
}

/// Result of a feature access check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFeatureAccessResult {
    /// Whether the principal clears the requirement.
    pub has_access: bool,

    /// The tier the check ran against (`free` for unknown principals).
    pub user_tier: MembershipTier,

    /// Minimum tier that clears the requirement, `None` when the requirement
    /// set is empty and nothing would.
    pub required_tier: Option<MembershipTier>,
}

/// Handler for feature access checks.
///
/// Resolves the caller's effective tier and evaluates it against the
/// requirement. A missing principal is never an error here: the answer is a
/// deterministic denial with the caller treated as `free`.
pub struct CheckFeatureAccessHandler {
    reader: Arc<dyn MembershipReader>,
}

impl CheckFeatureAccessHandler {
    pub fn new(reader: Arc<dyn MembershipReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: CheckFeatureAccessQuery,
    ) -> Result<CheckFeatureAccessResult, MembershipError> {
        let user_tier = match &query.user_id {
            Some(user_id) => self
                .reader
                .get_tier(user_id)
                .await
                .map_err(|e| MembershipError::infrastructure(e.to_string()))?,
            None => MembershipTier::Free,
        };

        // An anonymous caller is denied outright, even for free-gated
        // features; grants require a known principal.
        let has_access = query.user_id.is_some() && query.requirement.grants(user_tier);

        Ok(CheckFeatureAccessResult {
            has_access,
            user_tier,
            required_tier: query.requirement.required_tier(),
        })
    }
}
