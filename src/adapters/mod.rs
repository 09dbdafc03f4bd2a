//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session validation (JWT, mock)
//! - `events` - Event bus implementations (in-memory fan-out, logging handler)
//! - `http` - REST API surface and middleware
//! - `payment` - Payment gateway clients (ZaloPay, mock)
//! - `postgres` - Persistence for membership records and payments
//! - `rate_limiter` - Fixed-window rate limiting (in-memory, Redis)

pub mod auth;
pub mod events;
pub mod http;
pub mod payment;
pub mod postgres;
pub mod rate_limiter;
