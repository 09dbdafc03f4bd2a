//! RegisterMembershipHandler - Command handler for creating free memberships.

use std::sync::Arc;

use crate::domain::foundation::{MembershipId, Timestamp, UserId};
use crate::domain::membership::{MembershipError, MembershipEvent, MembershipRecord};
use crate::ports::{EventPublisher, MembershipRepository};

/// Command to register a new free membership.
#[derive(Debug, Clone)]
pub struct RegisterMembershipCommand {
    pub user_id: UserId,
}

/// Result of successful registration.
#[derive(Debug, Clone)]
pub struct RegisterMembershipResult {
    pub membership: MembershipRecord,
    pub event: MembershipEvent,
}

/// Handler for registering memberships.
///
/// Every user gets exactly one record, created at signup with the free tier.
/// Registering twice for the same user is a conflict.
pub struct RegisterMembershipHandler {
    repository: Arc<dyn MembershipRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RegisterMembershipHandler {
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
        cmd: RegisterMembershipCommand,
    ) -> Result<RegisterMembershipResult, MembershipError> {
        // 1. Reject duplicate registrations
        if self
            .repository
            .find_by_user_id(&cmd.user_id)
            .await?
            .is_some()
        {
            return Err(MembershipError::already_exists(cmd.user_id));
        }

        // 2. Create the free record
        let now = Timestamp::now();
        let membership = MembershipRecord::register(MembershipId::new(), cmd.user_id.clone(), now);

        // 3. Persist (the unique user_id constraint backstops the check above)
        self.repository.save(&membership).await?;

        // 4. Publish event
        let event = MembershipEvent::Created {
            membership_id: membership.id.clone(),
            user_id: cmd.user_id,
            tier: membership.tier,
            occurred_at: now,
        };
        self.event_publisher.publish(event.to_envelope()).await?;

        Ok(RegisterMembershipResult { membership, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
    use crate::domain::membership::{MembershipStatus, MembershipTier};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockMembershipRepository {
        records: Mutex<Vec<MembershipRecord>>,
        fail_save: bool,
    }

    impl MockMembershipRepository {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                fail_save: false,
            }
        }

        fn with_record(record: MembershipRecord) -> Self {
            Self {
                records: Mutex::new(vec![record]),
                fail_save: false,
            }
        }

        fn failing_save() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                fail_save: true,
            }
        }

        fn records(&self) -> Vec<MembershipRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MembershipRepository for MockMembershipRepository {
        async fn save(&self, record: &MembershipRecord) -> Result<(), DomainError> {
            if self.fail_save {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated save failure",
                ));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn update(&self, record: &MembershipRecord) -> Result<(), DomainError> {
            let mut records = self.records.lock().unwrap();
            if let Some(r) = records.iter_mut().find(|r| r.id == record.id) {
                *r = record.clone();
            }
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &MembershipId,
        ) -> Result<Option<MembershipRecord>, DomainError> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|r| &r.id == id).cloned())
        }

        async fn find_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<MembershipRecord>, DomainError> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|r| &r.user_id == user_id).cloned())
        }

        async fn delete(&self, _id: &MembershipId) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct MockEventPublisher {
        published_events: Mutex<Vec<EventEnvelope>>,
    }

    impl MockEventPublisher {
        fn new() -> Self {
            Self {
                published_events: Mutex::new(Vec::new()),
            }
        }

        fn published_events(&self) -> Vec<EventEnvelope> {
            self.published_events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for MockEventPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.published_events.lock().unwrap().push(event);
            Ok(())
        }

        async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
            for event in events {
                self.publish(event).await?;
            }
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_user_id() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn registers_free_active_membership() {
        let repo = Arc::new(MockMembershipRepository::new());
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = RegisterMembershipHandler::new(repo.clone(), publisher);
        let result = handler
            .handle(RegisterMembershipCommand {
                user_id: test_user_id(),
            })
            .await
            .unwrap();

        assert_eq!(result.membership.tier, MembershipTier::Free);
        assert_eq!(result.membership.status, MembershipStatus::Active);
        assert_eq!(result.membership.expires_at, None);
        assert_eq!(repo.records().len(), 1);
    }

    #[tokio::test]
    async fn publishes_created_event() {
        let repo = Arc::new(MockMembershipRepository::new());
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = RegisterMembershipHandler::new(repo, publisher.clone());
        handler
            .handle(RegisterMembershipCommand {
                user_id: test_user_id(),
            })
            .await
            .unwrap();

        let events = publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "membership.created");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn rejects_duplicate_registration() {
        let user_id = test_user_id();
        let existing = MembershipRecord::register(MembershipId::new(), user_id.clone(), Timestamp::now());
        let repo = Arc::new(MockMembershipRepository::with_record(existing));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = RegisterMembershipHandler::new(repo.clone(), publisher.clone());
        let result = handler
            .handle(RegisterMembershipCommand { user_id })
            .await;

        assert!(matches!(result, Err(MembershipError::AlreadyExists(_))));
        assert_eq!(repo.records().len(), 1);
        assert!(publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn does_not_publish_on_save_failure() {
        let repo = Arc::new(MockMembershipRepository::failing_save());
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = RegisterMembershipHandler::new(repo, publisher.clone());
        let result = handler
            .handle(RegisterMembershipCommand {
                user_id: test_user_id(),
            })
            .await;

        assert!(result.is_err());
        assert!(publisher.published_events().is_empty());
    }
}
