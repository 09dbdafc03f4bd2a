//! Payment history entries.
//!
//! Each successful (or attempted) purchase appends an entry to the owning
//! membership record. Amounts are integer VND; the gateway transaction id is
//! the idempotency key for callback processing.

use crate::domain::foundation::{PaymentId, Timestamp};
use serde::{Deserialize, Serialize};

use super::MembershipTier;

/// Outcome of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, gateway confirmation not yet received.
    Pending,

    /// Gateway confirmed the charge.
    Completed,

    /// Gateway reported the charge failed.
    Failed,
}

impl PaymentStatus {
    /// Returns the storage code for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Parses an exact status code. Returns `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// One element of a membership's payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    /// Unique identifier for this entry.
    pub id: PaymentId,

    /// Amount charged, in VND (integer, no minor units).
    pub amount: i64,

    /// ISO currency code ("VND").
    pub currency: String,

    /// Tier the purchase paid for.
    pub tier_at_purchase: MembershipTier,

    /// Outcome of the charge.
    pub status: PaymentStatus,

    /// Gateway that processed the charge (e.g. "zalopay").
    pub provider: String,

    /// Gateway-assigned transaction id; idempotency key for callbacks.
    pub provider_txn_id: Option<String>,

    /// When the charge was confirmed.
    pub paid_at: Timestamp,
}

impl PaymentEntry {
    /// Creates a completed payment entry for a confirmed gateway charge.
    pub fn completed(
        amount: i64,
        currency: impl Into<String>,
        tier: MembershipTier,
        provider: impl Into<String>,
        provider_txn_id: impl Into<String>,
        paid_at: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            amount,
            currency: currency.into(),
            tier_at_purchase: tier,
            status: PaymentStatus::Completed,
            provider: provider.into(),
            provider_txn_id: Some(provider_txn_id.into()),
            paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_entry_carries_transaction_id() {
        let entry = PaymentEntry::completed(
            99_000,
            "VND",
            MembershipTier::Premium,
            "zalopay",
            "240115000001",
            Timestamp::now(),
        );

        assert_eq!(entry.status, PaymentStatus::Completed);
        assert_eq!(entry.amount, 99_000);
        assert_eq!(entry.provider, "zalopay");
        assert_eq!(entry.provider_txn_id.as_deref(), Some("240115000001"));
    }

    #[test]
    fn payment_status_parses_exact_codes_only() {
        assert_eq!(PaymentStatus::parse("completed"), Some(PaymentStatus::Completed));
        assert_eq!(PaymentStatus::parse("pending"), Some(PaymentStatus::Pending));
        assert_eq!(PaymentStatus::parse("failed"), Some(PaymentStatus::Failed));
        assert_eq!(PaymentStatus::parse("done"), None);
    }

    #[test]
    fn payment_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = PaymentEntry::completed(
            199_000,
            "VND",
            MembershipTier::Pro,
            "zalopay",
            "240115000002",
            Timestamp::now(),
        );

        let json = serde_json::to_string(&entry).unwrap();
        let restored: PaymentEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, entry);
    }
}
