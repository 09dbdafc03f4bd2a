//! Rate limiter adapters.
//!
//! Implementations of the RateLimiter port for different backends.
//!
//! ## Available Adapters
//!
//! - `InMemoryRateLimiter` - In-memory for development and single-server
//! - `RedisRateLimiter` - Redis-backed for production multi-server
//!
//! Both backends are tier-aware: [`TierSyncHandler`] listens to membership
//! events and feeds tier changes into the active limiter, so paid users get
//! their larger quotas without a database lookup on the hot path.
//!
//! ## Usage
//!
//! ```ignore
//! use nosmoke::adapters::rate_limiter::{
//!     InMemoryRateLimiter, RateLimitConfig, TierSyncHandler,
//! };
//!
//! // For development
//! let limiter = Arc::new(InMemoryRateLimiter::with_defaults());
//!
//! // For production
//! let limiter = Arc::new(RedisRateLimiter::new(redis_conn, RateLimitConfig::default()));
//!
//! // Keep quotas in step with membership changes
//! TierSyncHandler::subscribe_membership_events(limiter.clone(), &event_bus);
//! ```

mod config;
mod in_memory;
mod redis;
mod tier_sync;

pub use config::{GlobalLimits, IpLimits, RateLimitConfig, ResourceLimits, TierRateLimits};
pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;
pub use tier_sync::{TierSync, TierSyncHandler};
