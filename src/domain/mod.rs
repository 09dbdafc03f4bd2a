//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, events, errors)
//! - `membership` - Tier-gated access and membership lifecycle

pub mod foundation;
pub mod membership;
