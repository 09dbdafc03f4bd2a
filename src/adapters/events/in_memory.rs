//! In-memory event bus.
//!
//! Single-process event delivery backing the default deployment: handlers
//! register by event type and are fanned out to concurrently on publish.
//! A bounded ring of recent events supports test assertions and debugging.
//!
//! # Delivery Semantics
//!
//! - At-least-once within the process; events are lost on restart
//! - Handler failures are logged and do not fail the publish, so one broken
//!   subscriber cannot roll back an API request
//! - Handlers for the same event run concurrently

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// Default number of recent events retained for introspection.
const DEFAULT_RING_CAPACITY: usize = 256;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe("membership.upgraded", handler);
///
/// bus.publish(envelope).await?;
///
/// assert!(bus.has_event("membership.upgraded"));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    recent: RwLock<VecDeque<EventEnvelope>>,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Creates a new event bus with the default ring capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    /// Creates a new event bus retaining at most `capacity` recent events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            recent: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    // === Introspection ===

    /// Returns the retained recent events, oldest first.
    pub fn recent_events(&self) -> Vec<EventEnvelope> {
        self.recent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Returns retained events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.recent_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns retained events for a specific aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.recent_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    /// Clears the retained events (for test isolation).
    pub fn clear(&self) {
        self.recent
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns the count of retained events.
    pub fn event_count(&self) -> usize {
        self.recent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks if an event of the given type was published recently.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.recent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    fn retain(&self, event: &EventEnvelope) {
        let mut recent = self.recent.write().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(event.clone());
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.retain(&event);

        // Snapshot handlers so no lock is held across await points
        let subscribers = self.handlers_for(&event.event_type);
        if subscribers.is_empty() {
            tracing::debug!(event_type = %event.event_type, "No subscribers for event");
            return Ok(());
        }

        let results = join_all(
            subscribers
                .iter()
                .map(|handler| handler.handle(event.clone())),
        )
        .await;

        for (handler, result) in subscribers.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    error = %e,
                    "Event handler failed"
                );
            }
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}
