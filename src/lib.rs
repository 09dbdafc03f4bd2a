//! NoSmoke Membership Service
//!
//! This crate implements tier-gated access control for the NoSmoke cessation
//! platform: the membership domain model, the HTTP gate middleware and API,
//! and the client-side membership cache and feature gate.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
