//! HTTP adapters - REST API implementations.
//!
//! The membership module owns the API surface; middleware carries the
//! cross-cutting concerns (auth, tier gating, rate limiting).

pub mod health;
pub mod membership;
pub mod middleware;

// Re-export key types for convenience
pub use health::health_routes;
pub use membership::membership_router;
pub use membership::MembershipAppState;
