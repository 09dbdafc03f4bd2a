//! PostgreSQL implementation of MembershipReader.
//!
//! Read-optimized queries for membership views and tier lookups. Expiry
//! reconciliation happens here, on read, through the same
//! [`effective_tier`] the aggregate uses, so a lapsed paid tier is reported
//! as free without waiting for a write to observe the lapse.

use crate::domain::foundation::{DomainError, ErrorCode, MembershipId, Timestamp, UserId};
use crate::domain::membership::{effective_tier, MembershipStatus, MembershipTier};
use crate::ports::{MembershipReader, MembershipView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the MembershipReader port.
pub struct PostgresMembershipReader {
    pool: PgPool,
}

impl PostgresMembershipReader {
    /// Creates a new PostgresMembershipReader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row for full membership view queries.
#[derive(Debug, sqlx::FromRow)]
struct MembershipViewRow {
    id: Uuid,
    user_id: String,
    tier: String,
    status: String,
    started_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn parse_tier(s: &str) -> Result<MembershipTier, DomainError> {
    MembershipTier::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )
    })
}

fn parse_status(s: &str) -> Result<MembershipStatus, DomainError> {
    MembershipStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )
    })
}

fn calculate_days_remaining(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(end) = expires_at else {
        return 0;
    };

    if now >= end {
        return 0;
    }

    end.signed_duration_since(now).num_days().max(0) as u32
}

impl MembershipViewRow {
    fn into_view(self, now: Timestamp) -> Result<MembershipView, DomainError> {
        let stored_tier = parse_tier(&self.tier)?;
        let status = parse_status(&self.status)?;
        let expires_at = self.expires_at.map(Timestamp::from_datetime);

        let tier = effective_tier(stored_tier, expires_at, now);
        let is_expired = stored_tier.is_paid() && tier == MembershipTier::Free;
        let days_remaining = calculate_days_remaining(self.expires_at, *now.as_datetime());

        Ok(MembershipView {
            id: MembershipId::from_uuid(self.id),
            user_id: UserId::new(self.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            tier,
            status,
            is_expired,
            started_at: Timestamp::from_datetime(self.started_at),
            expires_at,
            days_remaining,
            created_at: Timestamp::from_datetime(self.created_at),
        })
    }
}

#[async_trait]
impl MembershipReader for PostgresMembershipReader {
    async fn get_by_user(&self, user_id: &UserId) -> Result<Option<MembershipView>, DomainError> {
        let row: Option<MembershipViewRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, tier, status, started_at, expires_at, created_at
            FROM memberships
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to get membership: {}", e),
            )
        })?;

        row.map(|r| r.into_view(Timestamp::now())).transpose()
    }

    async fn get_tier(&self, user_id: &UserId) -> Result<MembershipTier, DomainError> {
        let row: Option<(String, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            SELECT tier, expires_at
            FROM memberships
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to get tier: {}", e))
        })?;

        // Users without a record hold free access
        let Some((tier_str, expires_at)) = row else {
            return Ok(MembershipTier::Free);
        };

        let stored = parse_tier(&tier_str)?;
        Ok(effective_tier(
            stored,
            expires_at.map(Timestamp::from_datetime),
            Timestamp::now(),
        ))
    }
}
