//! Health check endpoint.
//!
//! Load balancers and uptime monitors poll this route; it carries no
//! authentication and does not touch the database.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Health check payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the process is serving requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version, for spotting stale deployments.
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates the health check router.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}
