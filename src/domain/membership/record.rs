//! Membership record aggregate.
//!
//! One record per user, tracking the stored tier, lifecycle status, paid
//! period, and payment history. The stored tier is what the user bought;
//! [`MembershipRecord::effective_tier`] is what they currently get, after
//! expiry is taken into account. Every read path that turns a record into an
//! access level goes through that one reconciliation.

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};

use super::{MembershipStatus, MembershipTier, PaymentEntry};

/// Normalizes a stored tier against its expiry.
///
/// A paid tier whose expiry has passed grants `free`; a free tier never
/// expires. Status is deliberately not an input: a cancelled membership keeps
/// its tier until the paid period runs out.
pub fn effective_tier(
    stored: MembershipTier,
    expires_at: Option<Timestamp>,
    now: Timestamp,
) -> MembershipTier {
    if !stored.is_paid() {
        return MembershipTier::Free;
    }
    match expires_at {
        Some(expiry) if !now.is_before(&expiry) => MembershipTier::Free,
        _ => stored,
    }
}

/// A user's membership: tier, status, paid period, and payment history.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRecord {
    pub id: MembershipId,
    pub user_id: UserId,
    pub tier: MembershipTier,
    pub status: MembershipStatus,
    pub started_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub payment_history: Vec<PaymentEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MembershipRecord {
    /// Registers a new free, active membership.
    pub fn register(id: MembershipId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            id,
            user_id,
            tier: MembershipTier::Free,
            status: MembershipStatus::Active,
            started_at: now,
            expires_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            payment_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The tier this record currently grants, after expiry reconciliation.
    pub fn effective_tier(&self, now: Timestamp) -> MembershipTier {
        effective_tier(self.tier, self.expires_at, now)
    }

    /// Whether a paid period exists and has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.tier.is_paid()
            && matches!(self.expires_at, Some(expiry) if !now.is_before(&expiry))
    }

    /// Days left in the paid period, zero once expired or for free tiers.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        match self.expires_at {
            Some(expiry) if now.is_before(&expiry) => {
                expiry.duration_since(&now).num_days().max(0) as u32
            }
            _ => 0,
        }
    }

    /// Whether a gateway transaction has already been applied to this record.
    pub fn has_payment(&self, provider_txn_id: &str) -> bool {
        self.payment_history
            .iter()
            .any(|entry| entry.provider_txn_id.as_deref() == Some(provider_txn_id))
    }

    /// Applies a confirmed purchase of `tier` lasting `duration_days`.
    ///
    /// Buying the tier already held extends the period from whichever is
    /// later, now or the current expiry. Buying a higher tier starts a fresh
    /// period at the new tier. Buying below the currently effective tier is
    /// rejected. Any accepted purchase reactivates a cancelled record.
    pub fn apply_purchase(
        &mut self,
        tier: MembershipTier,
        duration_days: u32,
        payment: PaymentEntry,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if !tier.is_paid() {
            return Err(DomainError::validation(
                "tier",
                "Free tier cannot be purchased",
            ));
        }

        let current = self.effective_tier(now);
        if tier.rank() < current.rank() {
            return Err(DomainError::validation(
                "tier",
                format!(
                    "Cannot downgrade from {} to {}",
                    current.display_name(),
                    tier.display_name()
                ),
            ));
        }

        // Same-tier renewal stacks onto any unexpired period; an upgrade
        // starts its own period.
        let base = match self.expires_at {
            Some(expiry) if tier == self.tier && now.is_before(&expiry) => expiry,
            _ => now,
        };

        self.tier = tier;
        self.status = MembershipStatus::Active;
        self.expires_at = Some(base.add_days(i64::from(duration_days)));
        self.cancelled_at = None;
        self.cancellation_reason = None;
        self.payment_history.push(payment);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the membership, keeping tier and expiry intact.
    ///
    /// Access continues until the paid period runs out; only auto-renewal
    /// intent is withdrawn. Cancelling twice is rejected.
    pub fn cancel(&mut self, reason: Option<String>, now: Timestamp) -> Result<(), DomainError> {
        if self.status.is_cancelled() {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::InvalidStateTransition,
                "Membership is already cancelled",
            ));
        }

        self.status = MembershipStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(())
    }
}
