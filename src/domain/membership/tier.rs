//! Membership tier definitions.
//!
//! The single source of truth for the tier order. Every access decision in the
//! system (backend middleware, check endpoint, client gate, client store) goes
//! through this type; no other module declares the ordering.

use serde::{Deserialize, Serialize};

/// Membership subscription tier.
///
/// Totally ordered: `free < premium < pro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    /// Free tier - registration default, basic quit-plan tracking.
    Free,

    /// Premium tier - coach appointments and full progress analytics.
    Premium,

    /// Pro tier - everything in premium plus priority coaching.
    Pro,
}

impl MembershipTier {
    /// All tiers in ascending order.
    pub const ALL: [MembershipTier; 3] = [
        MembershipTier::Free,
        MembershipTier::Premium,
        MembershipTier::Pro,
    ];

    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, MembershipTier::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipTier::Free => "Free",
            MembershipTier::Premium => "Premium",
            MembershipTier::Pro => "Pro",
        }
    }

    /// Returns the wire/storage code for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTier::Free => "free",
            MembershipTier::Premium => "premium",
            MembershipTier::Pro => "pro",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more features. Used for access checks and upgrade
    /// validation.
    pub fn rank(&self) -> u8 {
        match self {
            MembershipTier::Free => 0,
            MembershipTier::Premium => 1,
            MembershipTier::Pro => 2,
        }
    }

    /// Returns true if this tier satisfies `minimum` in the tier order.
    pub fn is_at_least(&self, minimum: MembershipTier) -> bool {
        self.rank() >= minimum.rank()
    }

    /// Parses an exact tier code. Returns `None` for anything unrecognized.
    ///
    /// Used for data we own (database rows), where an unknown value is
    /// corruption rather than input to be coerced.
    pub fn parse(s: &str) -> Option<MembershipTier> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(MembershipTier::Free),
            "premium" => Some(MembershipTier::Premium),
            "pro" => Some(MembershipTier::Pro),
            _ => None,
        }
    }

    /// Parses a tier from untrusted input, coercing anything unrecognized
    /// (including empty strings) to `Free`.
    ///
    /// Used at trust boundaries: HTTP request bodies and client-side payloads.
    pub fn from_str_lenient(s: &str) -> MembershipTier {
        Self::parse(s).unwrap_or(MembershipTier::Free)
    }

    /// Derives a tier from a human-readable package name.
    ///
    /// Compatibility shim for payloads that predate the explicit tier code:
    /// substring match, case-insensitive, `pro` checked before `premium`.
    /// Anything else maps to `Free`.
    pub fn from_package_name(name: &str) -> MembershipTier {
        let lowered = name.to_lowercase();
        if lowered.contains("pro") {
            MembershipTier::Pro
        } else if lowered.contains("premium") {
            MembershipTier::Premium
        } else {
            MembershipTier::Free
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
