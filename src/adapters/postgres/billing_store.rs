//! PostgreSQL implementation of BillingStore.
//!
//! Both billing tables live in this crate's own schema, so the upgrade
//! commit is a real transaction: the conditional `applied_at` flip and the
//! tenant update land together or not at all. Replicas racing on the same
//! callback resolve to exactly one winner inside the database, and a loser's
//! tenant write never survives its failed marker flip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{BillingError, PlanId, SubscriptionStatus, Tenant};
use crate::ports::{BillingStore, MarkOutcome, PaymentAttempt};

/// PostgreSQL implementation of the BillingStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a tenant.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    slug: String,
    name: String,
    subscription_status: String,
    subscription_expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = BillingError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            slug: row.slug,
            name: row.name,
            status: parse_status(&row.subscription_status)?,
            subscription_expires_at: row.subscription_expires_at,
        })
    }
}

/// Database row representation of a payment attempt.
#[derive(Debug, sqlx::FromRow)]
struct PaymentAttemptRow {
    merchant_order_id: String,
    tenant_slug: String,
    plan_id: String,
    amount: i64,
    created_at: DateTime<Utc>,
    applied_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentAttemptRow> for PaymentAttempt {
    type Error = BillingError;

    fn try_from(row: PaymentAttemptRow) -> Result<Self, Self::Error> {
        Ok(PaymentAttempt {
            merchant_order_id: row.merchant_order_id,
            tenant_slug: row.tenant_slug,
            plan_id: parse_plan_id(&row.plan_id)?,
            amount: row.amount,
            created_at: row.created_at,
            applied_at: row.applied_at,
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, BillingError> {
    match s.to_lowercase().as_str() {
        "trial" => Ok(SubscriptionStatus::Trial),
        "paid" => Ok(SubscriptionStatus::Paid),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(BillingError::Database(format!(
            "invalid subscription status value: {}",
            s
        ))),
    }
}

fn parse_plan_id(s: &str) -> Result<PlanId, BillingError> {
    match s.to_lowercase().as_str() {
        "starter" => Ok(PlanId::Starter),
        "bisnis" => Ok(PlanId::Bisnis),
        "lifetime" => Ok(PlanId::Lifetime),
        _ => Err(BillingError::Database(format!(
            "invalid plan_id value: {}",
            s
        ))),
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn find_tenant(&self, slug: &str) -> Result<Option<Tenant>, BillingError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT slug, name, subscription_status, subscription_expires_at
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::Database(format!("Failed to find tenant: {}", e)))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), BillingError> {
        sqlx::query(
            r#"
            INSERT INTO payment_attempts (
                merchant_order_id, tenant_slug, plan_id, amount, created_at, applied_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (merchant_order_id) DO NOTHING
            "#,
        )
        .bind(&attempt.merchant_order_id)
        .bind(&attempt.tenant_slug)
        .bind(attempt.plan_id.as_str())
        .bind(attempt.amount)
        .bind(attempt.created_at)
        .bind(attempt.applied_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::Database(format!("Failed to record payment attempt: {}", e)))?;

        Ok(())
    }

    async fn find_attempt(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, BillingError> {
        let row: Option<PaymentAttemptRow> = sqlx::query_as(
            r#"
            SELECT merchant_order_id, tenant_slug, plan_id, amount, created_at, applied_at
            FROM payment_attempts
            WHERE merchant_order_id = $1
            "#,
        )
        .bind(merchant_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::Database(format!("Failed to find payment attempt: {}", e)))?;

        row.map(PaymentAttempt::try_from).transpose()
    }

    async fn commit_upgrade(
        &self,
        tenant: &Tenant,
        merchant_order_id: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<MarkOutcome, BillingError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BillingError::Database(format!("Failed to begin transaction: {}", e)))?;

        // The conditional flip decides ownership: only an unapplied row
        // flips, and the row lock it takes serializes racing replicas.
        let marked = sqlx::query(
            r#"
            UPDATE payment_attempts
            SET applied_at = $2
            WHERE merchant_order_id = $1 AND applied_at IS NULL
            "#,
        )
        .bind(merchant_order_id)
        .bind(applied_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| BillingError::Database(format!("Failed to mark attempt applied: {}", e)))?;

        if marked.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| {
                BillingError::Database(format!("Failed to roll back commit: {}", e))
            })?;

            let exists: Option<(String,)> = sqlx::query_as(
                "SELECT merchant_order_id FROM payment_attempts WHERE merchant_order_id = $1",
            )
            .bind(merchant_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BillingError::Database(format!("Failed to check attempt: {}", e)))?;

            return Ok(if exists.is_some() {
                MarkOutcome::AlreadyApplied
            } else {
                MarkOutcome::NotFound
            });
        }

        let saved = sqlx::query(
            r#"
            UPDATE tenants SET
                name = $2,
                subscription_status = $3,
                subscription_expires_at = $4,
                updated_at = NOW()
            WHERE slug = $1
            "#,
        )
        .bind(&tenant.slug)
        .bind(&tenant.name)
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| BillingError::Database(format!("Failed to save tenant: {}", e)))?;

        if saved.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| {
                BillingError::Database(format!("Failed to roll back commit: {}", e))
            })?;
            return Err(BillingError::TenantNotFound(tenant.slug.clone()));
        }

        tx.commit()
            .await
            .map_err(|e| BillingError::Database(format!("Failed to commit upgrade: {}", e)))?;

        Ok(MarkOutcome::Applied)
    }
}
