//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresMembershipRepository` - Membership records with payment history
//! - `PostgresMembershipReader` - Read-optimized membership queries

mod membership_reader;
mod membership_repository;

pub use membership_reader::PostgresMembershipReader;
pub use membership_repository::PostgresMembershipRepository;
