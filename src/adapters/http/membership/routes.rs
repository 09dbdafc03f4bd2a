//! Axum router configuration for membership endpoints.
//!
//! This module defines the route structure for membership-related API
//! endpoints and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_membership, check_feature_access, get_membership, register_membership,
    upgrade_membership, zalopay_callback, MembershipAppState,
};

/// Create the membership API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `GET /` - Get current user's membership details
/// - `POST /` - Register a free membership
/// - `POST /upgrade` - Start a paid upgrade
/// - `POST /cancel` - Cancel membership
///
/// ## Mixed Endpoints (optional authentication)
/// - `POST /check-feature-access` - Check access to a gated feature
pub fn membership_routes() -> Router<MembershipAppState> {
    Router::new()
        .route("/", get(get_membership).post(register_membership))
        .route("/check-feature-access", post(check_feature_access))
        .route("/upgrade", post(upgrade_membership))
        .route("/cancel", post(cancel_membership))
}

/// Create the payment gateway callback router.
///
/// Separate from the main membership routes because callbacks carry no user
/// authentication; they are verified by HMAC signature instead.
///
/// # Routes
/// - `POST /zalopay/callback` - Handle ZaloPay payment callbacks
pub fn payment_routes() -> Router<MembershipAppState> {
    Router::new().route("/zalopay/callback", post(zalopay_callback))
}

/// Create the complete membership module router.
///
/// Combines user routes and gateway callback routes into a single router
/// suitable for nesting under `/api`.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::membership::{membership_router, MembershipAppState};
///
/// let app_state = MembershipAppState { /* ... */ };
/// let app = Router::new()
///     .nest("/api", membership_router())
///     .with_state(app_state);
/// ```
pub fn membership_router() -> Router<MembershipAppState> {
    Router::new()
        .nest("/membership", membership_routes())
        .nest("/payments", payment_routes())
}
