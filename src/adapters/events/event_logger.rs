//! Structured-logging event handler.
//!
//! Subscribes to membership lifecycle events and writes one structured log
//! line per event, giving operators an audit trail of tier changes without
//! a dedicated audit store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventSubscriber};

/// Every membership lifecycle event type.
pub const MEMBERSHIP_EVENT_TYPES: [&str; 4] = [
    "membership.created",
    "membership.upgraded",
    "membership.cancelled",
    "membership.expired",
];

/// Logs each received event at info level.
#[derive(Debug, Default)]
pub struct EventLogger {
    seen: AtomicU64,
}

impl EventLogger {
    /// Creates a new logger handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a logger for all membership lifecycle events.
    pub fn subscribe_membership_events(bus: &dyn EventSubscriber) -> Arc<Self> {
        let logger = Arc::new(Self::new());
        bus.subscribe_all(&MEMBERSHIP_EVENT_TYPES, logger.clone());
        logger
    }

    /// Number of events this handler has logged.
    pub fn events_seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for EventLogger {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.seen.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            event_type = %event.event_type,
            event_id = %event.event_id,
            aggregate_id = %event.aggregate_id,
            aggregate_type = %event.aggregate_type,
            occurred_at = %event.occurred_at,
            "Domain event"
        );
        tracing::debug!(payload = %event.payload, "Domain event payload");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "EventLogger"
    }
}
