//! Membership reader port (read side / CQRS queries).
//!
//! Defines the contract for membership queries and read operations.
//! Optimized for UI display and quick access checks.
//!
//! # Design
//!
//! - **Read-optimized**: Can use caching, denormalized views
//! - **Separated from write**: CQRS pattern for scalability
//! - **Pre-reconciled**: Views carry the effective tier, never a stale paid
//!   tier whose period has lapsed
//!
//! # Example
//!
//! ```ignore
//! async fn display_membership_badge(
//!     reader: &dyn MembershipReader,
//!     user_id: &UserId,
//! ) -> Option<MembershipBadge> {
//!     let view = reader.get_by_user(user_id).await.ok()??;
//!     Some(MembershipBadge {
//!         tier: view.tier,
//!         days_remaining: view.days_remaining,
//!     })
//! }
//! ```

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};
use crate::domain::membership::{MembershipStatus, MembershipTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reader port for membership queries.
///
/// Provides read-optimized views of membership data.
/// Implementations may use caching for frequently-accessed data.
#[async_trait]
pub trait MembershipReader: Send + Sync {
    /// Get detailed membership view for a user.
    ///
    /// Returns `None` if user has no membership record.
    async fn get_by_user(&self, user_id: &UserId) -> Result<Option<MembershipView>, DomainError>;

    /// Get the tier a user's access checks should run against.
    ///
    /// Always an effective tier: expired paid records and absent records both
    /// come back as `Free`. This is the hot path for gating and should be
    /// cheap.
    async fn get_tier(&self, user_id: &UserId) -> Result<MembershipTier, DomainError>;
}

/// Detailed view of a membership for UI display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipView {
    /// Membership ID.
    pub id: MembershipId,

    /// User who owns this membership.
    pub user_id: UserId,

    /// Effective tier, after expiry reconciliation.
    pub tier: MembershipTier,

    /// Current lifecycle status.
    pub status: MembershipStatus,

    /// Whether a paid period existed and has lapsed.
    pub is_expired: bool,

    /// When the membership was registered.
    pub started_at: Timestamp,

    /// End of the paid period, if any.
    pub expires_at: Option<Timestamp>,

    /// Days remaining in the paid period. Zero for free or expired.
    pub days_remaining: u32,

    /// When the record was created.
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn membership_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn MembershipReader) {}
    }

    #[test]
    fn membership_view_serializes_effective_tier() {
        let view = MembershipView {
            id: MembershipId::new(),
            user_id: UserId::new("user-1").unwrap(),
            tier: MembershipTier::Premium,
            status: MembershipStatus::Active,
            is_expired: false,
            started_at: Timestamp::now(),
            expires_at: Some(Timestamp::now().add_days(30)),
            days_remaining: 30,
            created_at: Timestamp::now(),
        };

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"tier\":\"premium\""));
        assert!(json.contains("\"days_remaining\":30"));
    }
}
