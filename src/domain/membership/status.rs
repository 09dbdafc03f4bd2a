//! Membership status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a membership record.
///
/// Status tracks the user's intent, not their access: a cancelled membership
/// keeps its tier (and therefore its access) until the paid period expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Membership in good standing.
    Active,

    /// User requested cancellation; tier is retained until expiry.
    Cancelled,
}

impl MembershipStatus {
    /// Returns the storage code for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Cancelled => "cancelled",
        }
    }

    /// Parses an exact status code. Returns `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<MembershipStatus> {
        match s {
            "active" => Some(MembershipStatus::Active),
            "cancelled" => Some(MembershipStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns true if the user has asked to cancel.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MembershipStatus::Cancelled)
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn status_parses_exact_codes_only() {
        assert_eq!(MembershipStatus::parse("active"), Some(MembershipStatus::Active));
        assert_eq!(
            MembershipStatus::parse("cancelled"),
            Some(MembershipStatus::Cancelled)
        );
        assert_eq!(MembershipStatus::parse("expired"), None);
        assert_eq!(MembershipStatus::parse("Active"), None);
    }

    #[test]
    fn cancelled_is_flagged() {
        assert!(MembershipStatus::Cancelled.is_cancelled());
        assert!(!MembershipStatus::Active.is_cancelled());
    }
}
