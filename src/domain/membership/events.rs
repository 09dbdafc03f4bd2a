//! Membership domain events.
//!
//! Emitted on lifecycle transitions for audit logging and for anything that
//! keys off access changes (the client refresh signal in particular). Named
//! in past tense: `Upgraded`, not `Upgrade`.

use crate::domain::foundation::{EventEnvelope, MembershipId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::MembershipTier;

/// Events that occur during the membership lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipEvent {
    /// A new free membership was registered.
    Created {
        membership_id: MembershipId,
        user_id: UserId,
        tier: MembershipTier,
        occurred_at: Timestamp,
    },

    /// A confirmed purchase changed or extended the paid tier.
    ///
    /// Covers first purchase, tier upgrade, and same-tier renewal; for a
    /// renewal `previous_tier == new_tier` and only `expires_at` moves.
    Upgraded {
        membership_id: MembershipId,
        user_id: UserId,
        previous_tier: MembershipTier,
        new_tier: MembershipTier,
        expires_at: Timestamp,
        occurred_at: Timestamp,
    },

    /// The user withdrew renewal intent; access runs until the period ends.
    Cancelled {
        membership_id: MembershipId,
        user_id: UserId,
        reason: Option<String>,
        access_until: Option<Timestamp>,
        occurred_at: Timestamp,
    },

    /// A paid period ran out and the record now grants free access.
    Expired {
        membership_id: MembershipId,
        user_id: UserId,
        previous_tier: MembershipTier,
        occurred_at: Timestamp,
    },
}

impl MembershipEvent {
    /// Returns the event type string for routing and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            MembershipEvent::Created { .. } => "membership.created",
            MembershipEvent::Upgraded { .. } => "membership.upgraded",
            MembershipEvent::Cancelled { .. } => "membership.cancelled",
            MembershipEvent::Expired { .. } => "membership.expired",
        }
    }

    /// Returns the membership this event belongs to.
    pub fn membership_id(&self) -> &MembershipId {
        match self {
            MembershipEvent::Created { membership_id, .. }
            | MembershipEvent::Upgraded { membership_id, .. }
            | MembershipEvent::Cancelled { membership_id, .. }
            | MembershipEvent::Expired { membership_id, .. } => membership_id,
        }
    }

    /// Returns the user whose access this event affects.
    pub fn user_id(&self) -> &UserId {
        match self {
            MembershipEvent::Created { user_id, .. }
            | MembershipEvent::Upgraded { user_id, .. }
            | MembershipEvent::Cancelled { user_id, .. }
            | MembershipEvent::Expired { user_id, .. } => user_id,
        }
    }

    /// Returns when this event occurred.
    pub fn occurred_at(&self) -> Timestamp {
        match self {
            MembershipEvent::Created { occurred_at, .. }
            | MembershipEvent::Upgraded { occurred_at, .. }
            | MembershipEvent::Cancelled { occurred_at, .. }
            | MembershipEvent::Expired { occurred_at, .. } => *occurred_at,
        }
    }

    /// Wraps this event for transport on the event bus.
    pub fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope::new(
            self.event_type(),
            self.membership_id().to_string(),
            "Membership",
            serde_json::to_value(self)
                .expect("Event serialization should never fail for well-formed events"),
        )
        .with_occurred_at(self.occurred_at())
        .with_user_id(self.user_id().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_membership_id() -> MembershipId {
        MembershipId::new()
    }

    fn test_user_id() -> UserId {
        UserId::new("user-test-123").unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::now()
    }

    // ============================================================
    // Event Construction Tests
    // ============================================================

    #[test]
    fn created_event_is_free_tier() {
        let event = MembershipEvent::Created {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            tier: MembershipTier::Free,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "membership.created");
    }

    #[test]
    fn upgraded_event_captures_both_tiers_and_expiry() {
        let expires = now().add_days(30);
        let event = MembershipEvent::Upgraded {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Free,
            new_tier: MembershipTier::Premium,
            expires_at: expires,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "membership.upgraded");
        if let MembershipEvent::Upgraded {
            previous_tier,
            new_tier,
            expires_at,
            ..
        } = event
        {
            assert_eq!(previous_tier, MembershipTier::Free);
            assert_eq!(new_tier, MembershipTier::Premium);
            assert_eq!(expires_at, expires);
        } else {
            panic!("Expected Upgraded event");
        }
    }

    #[test]
    fn renewal_is_an_upgraded_event_with_equal_tiers() {
        let event = MembershipEvent::Upgraded {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Premium,
            new_tier: MembershipTier::Premium,
            expires_at: now().add_days(60),
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "membership.upgraded");
    }

    #[test]
    fn cancelled_event_keeps_access_window() {
        let until = now().add_days(12);
        let event = MembershipEvent::Cancelled {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            reason: Some("too expensive".to_string()),
            access_until: Some(until),
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "membership.cancelled");
        if let MembershipEvent::Cancelled { access_until, .. } = event {
            assert_eq!(access_until, Some(until));
        } else {
            panic!("Expected Cancelled event");
        }
    }

    #[test]
    fn expired_event_captures_lost_tier() {
        let event = MembershipEvent::Expired {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            previous_tier: MembershipTier::Pro,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "membership.expired");
        if let MembershipEvent::Expired { previous_tier, .. } = event {
            assert_eq!(previous_tier, MembershipTier::Pro);
        } else {
            panic!("Expected Expired event");
        }
    }

    // ============================================================
    // Event Type Tests
    // ============================================================

    #[test]
    fn all_event_types_are_namespaced() {
        let events = vec![
            MembershipEvent::Created {
                membership_id: test_membership_id(),
                user_id: test_user_id(),
                tier: MembershipTier::Free,
                occurred_at: now(),
            },
            MembershipEvent::Upgraded {
                membership_id: test_membership_id(),
                user_id: test_user_id(),
                previous_tier: MembershipTier::Free,
                new_tier: MembershipTier::Pro,
                expires_at: now().add_days(30),
                occurred_at: now(),
            },
            MembershipEvent::Cancelled {
                membership_id: test_membership_id(),
                user_id: test_user_id(),
                reason: None,
                access_until: None,
                occurred_at: now(),
            },
            MembershipEvent::Expired {
                membership_id: test_membership_id(),
                user_id: test_user_id(),
                previous_tier: MembershipTier::Premium,
                occurred_at: now(),
            },
        ];

        for event in events {
            assert!(
                event.event_type().starts_with("membership."),
                "Event type {} should be namespaced with 'membership.'",
                event.event_type()
            );
        }
    }

    // ============================================================
    // Envelope Tests
    // ============================================================

    #[test]
    fn to_envelope_carries_event_identity() {
        let membership_id = test_membership_id();
        let user_id = test_user_id();
        let occurred = now();

        let event = MembershipEvent::Upgraded {
            membership_id: membership_id.clone(),
            user_id: user_id.clone(),
            previous_tier: MembershipTier::Free,
            new_tier: MembershipTier::Premium,
            expires_at: occurred.add_days(30),
            occurred_at: occurred,
        };

        let envelope = event.to_envelope();
        assert_eq!(envelope.event_type, "membership.upgraded");
        assert_eq!(envelope.aggregate_id, membership_id.to_string());
        assert_eq!(envelope.aggregate_type, "Membership");
        assert_eq!(envelope.occurred_at, occurred);
        assert_eq!(envelope.metadata.user_id.as_deref(), Some(user_id.as_str()));
    }

    #[test]
    fn envelope_payload_round_trips_to_event() {
        let event = MembershipEvent::Cancelled {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            reason: Some("quit smoking, quit paying".to_string()),
            access_until: Some(now().add_days(3)),
            occurred_at: now(),
        };

        let envelope = event.to_envelope();
        let restored: MembershipEvent = envelope.payload_as().unwrap();
        assert_eq!(restored, event);
    }

    // ============================================================
    // Serialization Tests
    // ============================================================

    #[test]
    fn membership_event_serializes_to_json() {
        let event = MembershipEvent::Created {
            membership_id: test_membership_id(),
            user_id: test_user_id(),
            tier: MembershipTier::Free,
            occurred_at: now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Created"));
        assert!(json.contains("membership_id"));
        assert!(json.contains("user_id"));
    }

    #[test]
    fn accessors_return_owning_ids() {
        let membership_id = test_membership_id();
        let user_id = test_user_id();
        let occurred = now();

        let event = MembershipEvent::Expired {
            membership_id: membership_id.clone(),
            user_id: user_id.clone(),
            previous_tier: MembershipTier::Premium,
            occurred_at: occurred,
        };

        assert_eq!(event.membership_id(), &membership_id);
        assert_eq!(event.user_id(), &user_id);
        assert_eq!(event.occurred_at(), occurred);
    }
}
