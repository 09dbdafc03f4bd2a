//! Membership repository port (write side).
//!
//! Defines the contract for persisting and retrieving MembershipRecord
//! aggregates. Implementations handle the actual database operations.
//!
//! # Design
//!
//! - **Write-focused**: Optimized for aggregate persistence
//! - **Unique constraint**: Only one membership per user
//! - **Whole-aggregate writes**: Payment history rows ride along with the record
//!
//! # Example
//!
//! ```ignore
//! async fn register(
//!     repo: &dyn MembershipRepository,
//!     user_id: &UserId,
//! ) -> Result<MembershipRecord, DomainError> {
//!     if repo.find_by_user_id(user_id).await?.is_some() {
//!         return Err(DomainError::validation("user_id", "User already has membership"));
//!     }
//!
//!     let record = MembershipRecord::register(
//!         MembershipId::new(),
//!         user_id.clone(),
//!         Timestamp::now(),
//!     );
//!
//!     repo.save(&record).await?;
//!     Ok(record)
//! }
//! ```

use crate::domain::foundation::{DomainError, MembershipId, UserId};
use crate::domain::membership::MembershipRecord;
use async_trait::async_trait;

/// Repository port for MembershipRecord persistence.
///
/// Handles write operations for the membership lifecycle.
/// Implementations must ensure:
/// - Unique user_id constraint
/// - Payment history entries are persisted with the aggregate
/// - Duplicate payment ids are ignored, not errors (callback replays)
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Save a new membership.
    ///
    /// # Errors
    ///
    /// - `MembershipExists` if user already has a membership
    /// - `DatabaseError` on persistence failure
    async fn save(&self, record: &MembershipRecord) -> Result<(), DomainError>;

    /// Update an existing membership.
    ///
    /// # Errors
    ///
    /// - `MembershipNotFound` if membership doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, record: &MembershipRecord) -> Result<(), DomainError>;

    /// Find a membership by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &MembershipId)
        -> Result<Option<MembershipRecord>, DomainError>;

    /// Find a membership by user ID.
    ///
    /// Returns `None` if user has no membership.
    /// This is the primary lookup method since each user has at most one membership.
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<MembershipRecord>, DomainError>;

    /// Delete a membership (primarily for testing).
    ///
    /// In production, paid records lapse to free at expiry rather than being deleted.
    ///
    /// # Errors
    ///
    /// - `MembershipNotFound` if membership doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete(&self, id: &MembershipId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn membership_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn MembershipRepository) {}
    }
}
