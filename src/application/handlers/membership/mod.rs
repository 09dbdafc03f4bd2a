//! Membership handlers.
//!
//! Command and query handlers for membership lifecycle operations including:
//!
//! ## Commands
//! - Registering free memberships at signup
//! - Initiating paid upgrades through the payment provider
//! - Applying confirmed payment callbacks
//! - Cancelling memberships
//!
//! ## Queries
//! - Get membership details
//! - Check feature access against tier requirements

mod apply_payment_callback;
mod cancel_membership;
mod check_feature_access;
mod get_membership;
mod register_membership;
mod upgrade_membership;

// Commands
pub use apply_payment_callback::{
    ApplyPaymentCallbackCommand, ApplyPaymentCallbackHandler, ApplyPaymentCallbackResult,
};
pub use cancel_membership::{CancelMembershipCommand, CancelMembershipHandler, CancelMembershipResult};
pub use register_membership::{
    RegisterMembershipCommand, RegisterMembershipHandler, RegisterMembershipResult,
};
pub use upgrade_membership::{
    UpgradeMembershipCommand, UpgradeMembershipHandler, UpgradeMembershipResult,
};

// Queries
pub use check_feature_access::{
    CheckFeatureAccessHandler, CheckFeatureAccessQuery, CheckFeatureAccessResult,
};
pub use get_membership::{GetMembershipHandler, GetMembershipQuery, GetMembershipResult};
