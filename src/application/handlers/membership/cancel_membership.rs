//! CancelMembershipHandler - Command handler for cancelling memberships.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::membership::{MembershipError, MembershipEvent, MembershipRecord};
use crate::ports::{EventPublisher, MembershipRepository};

/// Command to cancel a membership.
#[derive(Debug, Clone)]
pub struct CancelMembershipCommand {
    pub user_id: UserId,
    pub reason: Option<String>,
}

/// Result of successful membership cancellation.
#[derive(Debug, Clone)]
pub struct CancelMembershipResult {
    pub membership: MembershipRecord,
    pub event: MembershipEvent,
    /// When paid access runs out. `None` for free-tier records.
    pub access_until: Option<Timestamp>,
}

/// Handler for cancelling memberships.
///
/// Cancellation is a status change, not a tier change. Any paid time already
/// bought keeps running until its expiry.
pub struct CancelMembershipHandler {
    repository: Arc<dyn MembershipRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelMembershipHandler {
    pub fn new(
        repository: Arc<dyn MembershipRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelMembershipCommand,
    ) -> Result<CancelMembershipResult, MembershipError> {
        // 1. Find the user's membership
        let mut membership = self
            .repository
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or_else(|| MembershipError::not_found_for_user(cmd.user_id.clone()))?;

        // 2. Cancel (domain logic)
        let now = Timestamp::now();
        let status_before = membership.status;
        membership
            .cancel(cmd.reason.clone(), now)
            .map_err(|e| MembershipError::invalid_state(status_before.as_str(), e.to_string()))?;

        // 3. Persist the update
        self.repository.update(&membership).await?;

        // 4. Create and publish event
        let access_until = membership.expires_at;
        let event = MembershipEvent::Cancelled {
            membership_id: membership.id.clone(),
            user_id: cmd.user_id,
            reason: cmd.reason,
            access_until,
            occurred_at: now,
        };
        self.event_publisher.publish(event.to_envelope()).await?;

        Ok(CancelMembershipResult {
            membership,
            event,
            access_until,
        })
    }
}
