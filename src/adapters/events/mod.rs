//! Event bus adapters.
//!
//! Adapters implement the event publishing and subscribing ports:
//!
//! - `InMemoryEventBus` - In-process bus with concurrent handler fan-out
//! - `EventLogger` - Handler that writes an audit log line per event

mod event_logger;
mod in_memory;

pub use event_logger::{EventLogger, MEMBERSHIP_EVENT_TYPES};
pub use in_memory::InMemoryEventBus;
