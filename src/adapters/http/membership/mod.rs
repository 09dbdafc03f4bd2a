//! HTTP adapter for membership endpoints.
//!
//! Exposes the membership domain via REST API:
//! - `GET /api/membership` - Get current user's membership
//! - `POST /api/membership` - Register a free membership
//! - `POST /api/membership/check-feature-access` - Check access to a gated feature
//! - `POST /api/membership/upgrade` - Start a paid upgrade
//! - `POST /api/membership/cancel` - Cancel membership
//! - `POST /api/payments/zalopay/callback` - Handle ZaloPay payment callbacks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{MembershipApiError, MembershipAppState};
pub use routes::{membership_router, membership_routes, payment_routes};
