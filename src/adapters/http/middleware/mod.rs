//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `auth` - Authentication middleware and extractors
//! - `membership_gate` - Tier gate for premium routes
//! - `rate_limit` - Rate limiting middleware and per-resource checks

pub mod auth;
pub mod membership_gate;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthRejection, AuthState, OptionalAuth, RequireAuth};
pub use membership_gate::{membership_gate_middleware, GateRejection, MembershipGate};
pub use rate_limit::{
    rate_limit_middleware, RateLimitCheck, RateLimitRejection, RateLimiterState,
};
