//! Keeps per-user rate limit quotas in step with membership changes.
//!
//! Limiters learn tiers from membership events rather than querying the
//! database on every request. [`TierSyncHandler`] subscribes to the
//! membership lifecycle events and pushes tier changes into whichever
//! limiter backend is active.

use async_trait::async_trait;
use std::sync::Arc;

use crate::adapters::events::MEMBERSHIP_EVENT_TYPES;
use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::domain::membership::{MembershipEvent, MembershipTier};
use crate::ports::{EventHandler, EventSubscriber};

/// Sink for user tier updates.
///
/// Implemented by rate limiter backends that keep a per-user tier map.
#[async_trait]
pub trait TierSync: Send + Sync {
    /// Record the tier to use for a user's rate limit quota.
    async fn set_user_tier(&self, user_id: &str, tier: MembershipTier);
}

/// Event handler that applies membership events to a [`TierSync`] sink.
pub struct TierSyncHandler {
    limiter: Arc<dyn TierSync>,
}

impl TierSyncHandler {
    /// Create a handler feeding the given limiter.
    pub fn new(limiter: Arc<dyn TierSync>) -> Self {
        Self { limiter }
    }

    /// Create a handler and subscribe it to all membership lifecycle events.
    pub fn subscribe_membership_events(
        limiter: Arc<dyn TierSync>,
        bus: &dyn EventSubscriber,
    ) -> Arc<Self> {
        let handler = Arc::new(Self::new(limiter));
        bus.subscribe_all(&MEMBERSHIP_EVENT_TYPES, handler.clone());
        handler
    }
}

#[async_trait]
impl EventHandler for TierSyncHandler {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let membership_event: MembershipEvent = event.payload_as()?;

        let update = match membership_event {
            MembershipEvent::Created { user_id, tier, .. } => Some((user_id, tier)),
            MembershipEvent::Upgraded {
                user_id, new_tier, ..
            } => Some((user_id, new_tier)),
            // Cancellation keeps paid access until the period ends, so the
            // quota holds until the expiry event arrives.
            MembershipEvent::Cancelled { .. } => None,
            MembershipEvent::Expired { user_id, .. } => Some((user_id, MembershipTier::Free)),
        };

        if let Some((user_id, tier)) = update {
            tracing::debug!(user_id = %user_id, tier = %tier, "Syncing rate limit tier");
            self.limiter.set_user_tier(user_id.as_str(), tier).await;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "TierSyncHandler"
    }
}

impl std::fmt::Debug for TierSyncHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierSyncHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{MembershipId, Timestamp, UserId};
    use crate::ports::EventPublisher;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTierSync {
        updates: Mutex<Vec<(String, MembershipTier)>>,
    }

    impl RecordingTierSync {
        fn updates(&self) -> Vec<(String, MembershipTier)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TierSync for RecordingTierSync {
        async fn set_user_tier(&self, user_id: &str, tier: MembershipTier) {
            self.updates
                .lock()
                .unwrap()
                .push((user_id.to_string(), tier));
        }
    }

    fn test_user_id() -> UserId {
        UserId::new("user-tier-sync").unwrap()
    }

    #[tokio::test]
    async fn created_event_records_initial_tier() {
        let sink = Arc::new(RecordingTierSync::default());
        let handler = TierSyncHandler::new(sink.clone());

        let event = MembershipEvent::Created {
            membership_id: MembershipId::new(),
            user_id: test_user_id(),
            tier: MembershipTier::Free,
            occurred_at: Timestamp::now(),
        };

        handler.handle(event.to_envelope()).await.unwrap();

        assert_eq!(
            sink.updates(),
            vec![("user-tier-sync".to_string(), MembershipTier::Free)]
        );
    }

    #[tokio::test]
    async fn upgraded_event_applies_new_tier() {
        let sink = Arc::new(RecordingTierSync::default());
        let handler = TierSyncHandler::new(sink.clone());

        let event = MembershipEvent::Upgraded {
            membership_id: MembershipId::new(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Free,
            new_tier: MembershipTier::Premium,
            expires_at: Timestamp::now().add_days(30),
            occurred_at: Timestamp::now(),
        };

        handler.handle(event.to_envelope()).await.unwrap();

        assert_eq!(
            sink.updates(),
            vec![("user-tier-sync".to_string(), MembershipTier::Premium)]
        );
    }

    #[tokio::test]
    async fn cancelled_event_leaves_tier_untouched() {
        let sink = Arc::new(RecordingTierSync::default());
        let handler = TierSyncHandler::new(sink.clone());

        let event = MembershipEvent::Cancelled {
            membership_id: MembershipId::new(),
            user_id: test_user_id(),
            reason: Some("too expensive".to_string()),
            access_until: Some(Timestamp::now().add_days(12)),
            occurred_at: Timestamp::now(),
        };

        handler.handle(event.to_envelope()).await.unwrap();

        assert!(sink.updates().is_empty());
    }

    #[tokio::test]
    async fn expired_event_drops_tier_to_free() {
        let sink = Arc::new(RecordingTierSync::default());
        let handler = TierSyncHandler::new(sink.clone());

        let event = MembershipEvent::Expired {
            membership_id: MembershipId::new(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Pro,
            occurred_at: Timestamp::now(),
        };

        handler.handle(event.to_envelope()).await.unwrap();

        assert_eq!(
            sink.updates(),
            vec![("user-tier-sync".to_string(), MembershipTier::Free)]
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let sink = Arc::new(RecordingTierSync::default());
        let handler = TierSyncHandler::new(sink.clone());

        let envelope = EventEnvelope::new(
            "membership.created",
            "membership-1",
            "Membership",
            serde_json::json!({"bogus": true}),
        );

        assert!(handler.handle(envelope).await.is_err());
        assert!(sink.updates().is_empty());
    }

    #[tokio::test]
    async fn subscription_covers_membership_lifecycle() {
        let bus = InMemoryEventBus::new();
        let sink = Arc::new(RecordingTierSync::default());
        let _handler = TierSyncHandler::subscribe_membership_events(sink.clone(), &bus);

        let event = MembershipEvent::Upgraded {
            membership_id: MembershipId::new(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Free,
            new_tier: MembershipTier::Pro,
            expires_at: Timestamp::now().add_days(365),
            occurred_at: Timestamp::now(),
        };

        bus.publish(event.to_envelope()).await.unwrap();

        assert_eq!(
            sink.updates(),
            vec![("user-tier-sync".to_string(), MembershipTier::Pro)]
        );
    }
}
