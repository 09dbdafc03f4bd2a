//! PostgreSQL implementation of MembershipRepository.
//!
//! Persists membership records and their payment history. The record row and
//! its payment rows are written in one transaction; payment rows are
//! append-only and keyed by payment id, so replaying an update never
//! duplicates history.

use crate::domain::foundation::{DomainError, ErrorCode, MembershipId, PaymentId, Timestamp, UserId};
use crate::domain::membership::{
    MembershipRecord, MembershipStatus, MembershipTier, PaymentEntry, PaymentStatus,
};
use crate::ports::MembershipRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the MembershipRepository port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    /// Creates a new PostgresMembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_payments(&self, membership_id: &Uuid) -> Result<Vec<PaymentEntry>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, amount, currency, tier_at_purchase, status, provider,
                   provider_txn_id, paid_at
            FROM membership_payments
            WHERE membership_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(membership_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load payment history: {}", e),
            )
        })?;

        rows.into_iter().map(PaymentEntry::try_from).collect()
    }
}

/// Database row representation of a membership record.
#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: Uuid,
    user_id: String,
    tier: String,
    status: String,
    started_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[allow(dead_code)]
    version: i32,
}

/// Database row representation of one applied payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    amount: i64,
    currency: String,
    tier_at_purchase: String,
    status: String,
    provider: String,
    provider_txn_id: Option<String>,
    paid_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_record(self, payments: Vec<PaymentEntry>) -> Result<MembershipRecord, DomainError> {
        let tier = parse_tier(&self.tier)?;
        let status = parse_status(&self.status)?;

        Ok(MembershipRecord {
            id: MembershipId::from_uuid(self.id),
            user_id: UserId::new(self.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            tier,
            status,
            started_at: Timestamp::from_datetime(self.started_at),
            expires_at: self.expires_at.map(Timestamp::from_datetime),
            cancelled_at: self.cancelled_at.map(Timestamp::from_datetime),
            cancellation_reason: self.cancellation_reason,
            payment_history: payments,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}

impl TryFrom<PaymentRow> for PaymentEntry {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentEntry {
            id: PaymentId::from_uuid(row.id),
            amount: row.amount,
            currency: row.currency,
            tier_at_purchase: parse_tier(&row.tier_at_purchase)?,
            status: parse_payment_status(&row.status)?,
            provider: row.provider,
            provider_txn_id: row.provider_txn_id,
            paid_at: Timestamp::from_datetime(row.paid_at),
        })
    }
}

// Rows are written exclusively by this adapter, so parsing is strict: an
// unknown code means the table and the code drifted apart, not bad input.

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

fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )
    })
}

async fn insert_payments(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    membership_id: &MembershipId,
    payments: &[PaymentEntry],
) -> Result<(), DomainError> {
    for payment in payments {
        sqlx::query(
            r#"
            INSERT INTO membership_payments (
                id, membership_id, amount, currency, tier_at_purchase,
                status, provider, provider_txn_id, paid_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(membership_id.as_uuid())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.tier_at_purchase.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.provider)
        .bind(&payment.provider_txn_id)
        .bind(payment.paid_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record payment: {}", e),
            )
        })?;
    }

    Ok(())
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn save(&self, record: &MembershipRecord) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to start transaction: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO memberships (
                id, user_id, tier, status, started_at, expires_at,
                cancelled_at, cancellation_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(record.tier.as_str())
        .bind(record.status.as_str())
        .bind(record.started_at.as_datetime())
        .bind(record.expires_at.map(|t| *t.as_datetime()))
        .bind(record.cancelled_at.map(|t| *t.as_datetime()))
        .bind(&record.cancellation_reason)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("memberships_user_id_key") {
                    return DomainError::new(
                        ErrorCode::MembershipExists,
                        "User already has a membership",
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save membership: {}", e),
            )
        })?;

        insert_payments(&mut tx, &record.id, &record.payment_history).await?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit membership: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, record: &MembershipRecord) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to start transaction: {}", e),
            )
        })?;

        let result = sqlx::query(
            r#"
            UPDATE memberships SET
                tier = $2,
                status = $3,
                started_at = $4,
                expires_at = $5,
                cancelled_at = $6,
                cancellation_reason = $7,
                updated_at = $8,
                version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.tier.as_str())
        .bind(record.status.as_str())
        .bind(record.started_at.as_datetime())
        .bind(record.expires_at.map(|t| *t.as_datetime()))
        .bind(record.cancelled_at.map(|t| *t.as_datetime()))
        .bind(&record.cancellation_reason)
        .bind(record.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update membership: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MembershipNotFound,
                "Membership not found",
            ));
        }

        insert_payments(&mut tx, &record.id, &record.payment_history).await?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit membership update: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<MembershipRecord>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, tier, status, started_at, expires_at,
                   cancelled_at, cancellation_reason, created_at, updated_at, version
            FROM memberships
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find membership: {}", e),
            )
        })?;

        match row {
            Some(row) => {
                let payments = self.load_payments(&row.id).await?;
                Ok(Some(row.into_record(payments)?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<MembershipRecord>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, tier, status, started_at, expires_at,
                   cancelled_at, cancellation_reason, created_at, updated_at, version
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
                format!("Failed to find membership: {}", e),
            )
        })?;

        match row {
            Some(row) => {
                let payments = self.load_payments(&row.id).await?;
                Ok(Some(row.into_record(payments)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &MembershipId) -> Result<(), DomainError> {
        // Payment rows go with the record via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete membership: {}", e),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MembershipNotFound,
                "Membership not found",
            ));
        }

        Ok(())
    }
}
