//! Billing store port.
//!
//! One port for the engine's own persistence: the tenant subscription slice
//! and the payment attempt journal live in the same database, and the tail
//! of payment application has to write both as one atomic unit. A split
//! tenant-write / marker-write surface would let two replicas racing on the
//! same callback each extend the subscription once.
//!
//! `applied_at` on the attempt row is the idempotency marker for webhook
//! processing. It lives in shared persistent storage so the guard holds
//! across process restarts and horizontal replicas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, PlanId, Tenant};

/// A recorded invoice attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Correlation key, unique per invoice.
    pub merchant_order_id: String,

    /// Tenant the invoice was issued for.
    pub tenant_slug: String,

    /// Plan priced into the invoice.
    pub plan_id: PlanId,

    /// Invoiced amount, minor units.
    pub amount: i64,

    /// When the invoice was created.
    pub created_at: DateTime<Utc>,

    /// When the successful callback was applied to the tenant, if ever.
    pub applied_at: Option<DateTime<Utc>>,
}

impl PaymentAttempt {
    /// Creates an unapplied attempt record.
    pub fn new(
        merchant_order_id: impl Into<String>,
        tenant_slug: impl Into<String>,
        plan_id: PlanId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            merchant_order_id: merchant_order_id.into(),
            tenant_slug: tenant_slug.into(),
            plan_id,
            amount,
            created_at,
            applied_at: None,
        }
    }
}

/// Outcome of the atomic upgrade commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This caller flipped the marker; its tenant write is the one that
    /// survived.
    Applied,

    /// The marker was already set - a duplicate delivery lost the race and
    /// none of its writes survived.
    AlreadyApplied,

    /// No attempt record exists for the order id.
    NotFound,
}

/// Port to the engine's own persistence.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Looks a tenant up by its slug.
    async fn find_tenant(&self, slug: &str) -> Result<Option<Tenant>, BillingError>;

    /// Records an attempt. Inserting an order id that already exists is a
    /// no-op, so concurrent recorders are safe.
    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), BillingError>;

    /// Finds an attempt by order id.
    async fn find_attempt(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, BillingError>;

    /// Atomically persists the upgraded tenant and sets the attempt's
    /// `applied_at`, if and only if the marker is still unset.
    ///
    /// Must be a single transaction in the backing store: when the marker
    /// turns out to be already set, the tenant write must not survive.
    /// Concurrent callers for the same order id see exactly one
    /// [`MarkOutcome::Applied`] and exactly one surviving tenant write.
    async fn commit_upgrade(
        &self,
        tenant: &Tenant,
        merchant_order_id: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<MarkOutcome, BillingError>;
}
