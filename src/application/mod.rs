//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::membership::{
    // Commands
    ApplyPaymentCallbackCommand, ApplyPaymentCallbackHandler, ApplyPaymentCallbackResult,
    CancelMembershipCommand, CancelMembershipHandler, CancelMembershipResult,
    RegisterMembershipCommand, RegisterMembershipHandler, RegisterMembershipResult,
    UpgradeMembershipCommand, UpgradeMembershipHandler, UpgradeMembershipResult,
    // Queries
    CheckFeatureAccessHandler, CheckFeatureAccessQuery, CheckFeatureAccessResult,
    GetMembershipHandler, GetMembershipQuery, GetMembershipResult,
};
