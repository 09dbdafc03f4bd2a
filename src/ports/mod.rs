//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Membership Ports
//!
//! - `MembershipRepository` - Write-side aggregate persistence
//! - `MembershipReader` - Read-side views and effective-tier lookups
//!
//! ## Payment Ports
//!
//! - `PaymentProvider` - Order creation and callback verification
//!
//! ## Auth Ports
//!
//! - `SessionValidator` - Bearer token validation
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events
//!
//! ## Protection Ports
//!
//! - `RateLimiter` - Fixed-window request quotas

mod event_publisher;
mod event_subscriber;
mod membership_reader;
mod membership_repository;
mod payment_provider;
mod rate_limiter;
mod session_validator;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use membership_reader::{MembershipReader, MembershipView};
pub use membership_repository::MembershipRepository;
pub use payment_provider::{
    CallbackEvent, CreateOrderRequest, PaymentError, PaymentErrorCode, PaymentOrder,
    PaymentProvider,
};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitScope,
    RateLimitStatus, RateLimiter,
};
pub use session_validator::SessionValidator;
