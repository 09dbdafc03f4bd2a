//! Membership domain module.
//!
//! Handles tier-gated access, the membership lifecycle, plans, and payment
//! history.
//!
//! # Module Structure
//!
//! - `record` - MembershipRecord aggregate and tier reconciliation
//! - `requirement` - AccessRequirement evaluation
//! - `status` - MembershipStatus lifecycle codes
//! - `tier` - MembershipTier levels and coercion
//! - `plan` - Purchasable plan catalog
//! - `payment` - Payment history entries
//! - `events` - Lifecycle domain events
//! - `errors` - Membership error types

mod errors;
mod events;
mod payment;
pub mod plan;
mod record;
mod requirement;
mod status;
mod tier;

pub use errors::MembershipError;
pub use events::MembershipEvent;
pub use payment::{PaymentEntry, PaymentStatus};
pub use plan::MembershipPlan;
pub use record::{effective_tier, MembershipRecord};
pub use requirement::{AccessDecision, AccessRequirement, DeniedAccess};
pub use status::MembershipStatus;
pub use tier::MembershipTier;
