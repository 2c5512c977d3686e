//! Subscription ledger.
//!
//! Applies a verified, successful payment to the owning tenant exactly once.
//! Two layers of protection against duplicate callbacks:
//!
//! 1. A per-order async mutex serializes concurrent deliveries inside one
//!    process, so the check-then-apply sequence is not interleaved. Entries
//!    are evicted once the last holder releases them.
//! 2. The store's upgrade commit writes the tenant and flips the attempt's
//!    `applied_at` marker in one transaction, which holds across restarts
//!    and replicas: a loser's tenant write never survives its failed flip.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::billing::{BillingError, Plan, SubscriptionStatus};
use crate::ports::{BillingStore, MarkOutcome, PaymentAttempt};

/// Result of posting a payment to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tenant_slug: String,
    pub status: SubscriptionStatus,
    pub subscription_expires_at: Option<DateTime<Utc>>,

    /// False when the payment had already been applied and this call was a
    /// duplicate delivery.
    pub newly_applied: bool,
}

/// Posts verified payments to tenant subscriptions.
pub struct SubscriptionLedger {
    store: Arc<dyn BillingStore>,
    order_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self {
            store,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, merchant_order_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.order_locks.lock().await;
        Arc::clone(
            locks
                .entry(merchant_order_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drops the lock entry once no other delivery holds a clone of it.
    async fn release_lock(&self, merchant_order_id: &str) {
        let mut locks = self.order_locks.lock().await;
        if let Some(entry) = locks.get(merchant_order_id) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(merchant_order_id);
            }
        }
    }

    /// Applies one successful payment to the tenant's subscription.
    ///
    /// Idempotent on `merchant_order_id`: the first call extends the
    /// subscription, every later call returns the current state with
    /// `newly_applied == false`.
    pub async fn apply_payment(
        &self,
        merchant_order_id: &str,
        tenant_slug: &str,
        plan: &'static Plan,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<LedgerReceipt, BillingError> {
        let order_lock = self.lock_for(merchant_order_id).await;
        let result = {
            let _guard = order_lock.lock().await;
            self.apply_serialized(merchant_order_id, tenant_slug, plan, amount, now)
                .await
        };
        drop(order_lock);
        self.release_lock(merchant_order_id).await;
        result
    }

    async fn apply_serialized(
        &self,
        merchant_order_id: &str,
        tenant_slug: &str,
        plan: &'static Plan,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<LedgerReceipt, BillingError> {
        let attempt = self.store.find_attempt(merchant_order_id).await?;
        if let Some(attempt) = &attempt {
            if attempt.applied_at.is_some() {
                tracing::info!(
                    merchant_order_id,
                    tenant_slug,
                    "Duplicate callback, payment already applied"
                );
                return self.receipt_for(tenant_slug, false).await;
            }
        }

        // Tenant resolved before any write: a callback for a tenant that no
        // longer exists must fail cleanly instead of tripping the attempt
        // table's foreign key on an orphan insert.
        let mut tenant = self
            .store
            .find_tenant(tenant_slug)
            .await?
            .ok_or_else(|| BillingError::TenantNotFound(tenant_slug.to_string()))?;

        if attempt.is_none() {
            // Callback for an order this node never recorded (issued before
            // a data migration, or by a replica that failed mid-write).
            // Record it now so the applied marker has a row to live on.
            tracing::warn!(
                merchant_order_id,
                tenant_slug,
                "Callback for unrecorded order, creating attempt row"
            );
            self.store
                .record_attempt(&PaymentAttempt::new(
                    merchant_order_id,
                    tenant_slug,
                    plan.id,
                    amount,
                    now,
                ))
                .await?;
        }

        tenant.apply_paid_period(plan, now);

        match self
            .store
            .commit_upgrade(&tenant, merchant_order_id, now)
            .await?
        {
            MarkOutcome::Applied => {
                tracing::info!(
                    merchant_order_id,
                    tenant_slug,
                    plan = plan.id.as_str(),
                    expires_at = ?tenant.subscription_expires_at,
                    "Subscription payment applied"
                );
                Ok(LedgerReceipt {
                    tenant_slug: tenant.slug,
                    status: tenant.status,
                    subscription_expires_at: tenant.subscription_expires_at,
                    newly_applied: true,
                })
            }
            MarkOutcome::AlreadyApplied => {
                // Another replica won between our check and our commit. Its
                // tenant write is the one that survived; ours was discarded
                // with the failed marker flip.
                tracing::info!(
                    merchant_order_id,
                    tenant_slug,
                    "Lost apply race to concurrent replica"
                );
                self.receipt_for(tenant_slug, false).await
            }
            MarkOutcome::NotFound => Err(BillingError::Database(format!(
                "attempt row vanished for order {}",
                merchant_order_id
            ))),
        }
    }

    async fn receipt_for(
        &self,
        tenant_slug: &str,
        newly_applied: bool,
    ) -> Result<LedgerReceipt, BillingError> {
        let tenant = self
            .store
            .find_tenant(tenant_slug)
            .await?
            .ok_or_else(|| BillingError::TenantNotFound(tenant_slug.to_string()))?;

        Ok(LedgerReceipt {
            tenant_slug: tenant.slug,
            status: tenant.status,
            subscription_expires_at: tenant.subscription_expires_at,
            newly_applied,
        })
    }

    #[cfg(test)]
    async fn order_lock_count(&self) -> usize {
        self.order_locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{PlanId, Tenant, STARTER};
    use chrono::Duration;

    const ORDER: &str = "SUB-WARKOP-1732000000000";

    async fn store_with_tenant() -> Arc<InMemoryBillingStore> {
        let store = Arc::new(InMemoryBillingStore::new());
        store.insert_tenant(Tenant::trial("warkop", "Warkop Jakarta")).await;
        store
    }

    #[tokio::test]
    async fn first_application_upgrades_tenant() {
        let ledger = SubscriptionLedger::new(store_with_tenant().await);
        let now = Utc::now();

        let receipt = ledger
            .apply_payment(ORDER, "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();

        assert!(receipt.newly_applied);
        assert_eq!(receipt.status, SubscriptionStatus::Paid);
        assert_eq!(
            receipt.subscription_expires_at,
            Some(now + Duration::days(30))
        );
    }

    #[tokio::test]
    async fn duplicate_application_extends_nothing() {
        let ledger = SubscriptionLedger::new(store_with_tenant().await);
        let now = Utc::now();

        let first = ledger
            .apply_payment(ORDER, "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();
        let second = ledger
            .apply_payment(ORDER, "warkop", &STARTER, 99_000, now + Duration::hours(1))
            .await
            .unwrap();

        assert!(first.newly_applied);
        assert!(!second.newly_applied);
        assert_eq!(
            second.subscription_expires_at,
            first.subscription_expires_at
        );
    }

    #[tokio::test]
    async fn distinct_orders_stack_subscription_periods() {
        let ledger = SubscriptionLedger::new(store_with_tenant().await);
        let now = Utc::now();

        ledger
            .apply_payment("SUB-WARKOP-1", "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();
        let second = ledger
            .apply_payment("SUB-WARKOP-2", "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();

        assert_eq!(
            second.subscription_expires_at,
            Some(now + Duration::days(60))
        );
    }

    #[tokio::test]
    async fn unknown_tenant_fails_without_recording_attempt() {
        let store = store_with_tenant().await;
        let ledger = SubscriptionLedger::new(store.clone());

        let err = ledger
            .apply_payment(ORDER, "nowhere", &STARTER, 99_000, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::TenantNotFound(_)));

        // No orphan attempt row pointing at the missing tenant.
        assert!(store.find_attempt(ORDER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_duplicates_apply_exactly_once() {
        let store = store_with_tenant().await;
        let ledger = Arc::new(SubscriptionLedger::new(store.clone()));

        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_payment(ORDER, "warkop", &STARTER, 99_000, now)
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().newly_applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let tenant = store.find_tenant("warkop").await.unwrap().unwrap();
        assert_eq!(
            tenant.subscription_expires_at,
            Some(now + Duration::days(30))
        );
    }

    #[tokio::test]
    async fn replicas_sharing_a_store_apply_exactly_once() {
        let store = store_with_tenant().await;

        // Two ledger instances, as two server replicas behind a load
        // balancer: the per-order mutex is per-process and cannot serialize
        // across them. Only the store's transactional commit keeps the
        // duplicate deliveries from each extending the subscription.
        let replica_a = Arc::new(SubscriptionLedger::new(store.clone()));
        let replica_b = Arc::new(SubscriptionLedger::new(store.clone()));

        let now = Utc::now();
        let mut handles = Vec::new();
        for i in 0..8 {
            let ledger = if i % 2 == 0 {
                Arc::clone(&replica_a)
            } else {
                Arc::clone(&replica_b)
            };
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_payment(ORDER, "warkop", &STARTER, 99_000, now)
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().newly_applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        // One 30-day period, not one per replica.
        let tenant = store.find_tenant("warkop").await.unwrap().unwrap();
        assert_eq!(
            tenant.subscription_expires_at,
            Some(now + Duration::days(30))
        );
    }

    #[tokio::test]
    async fn unrecorded_order_gets_synthetic_attempt() {
        let store = store_with_tenant().await;
        let ledger = SubscriptionLedger::new(store.clone());

        ledger
            .apply_payment(ORDER, "warkop", &STARTER, 99_000, Utc::now())
            .await
            .unwrap();

        let attempt = store.find_attempt(ORDER).await.unwrap().unwrap();
        assert_eq!(attempt.plan_id, PlanId::Starter);
        assert!(attempt.applied_at.is_some());
    }

    #[tokio::test]
    async fn order_locks_drain_after_application() {
        let ledger = SubscriptionLedger::new(store_with_tenant().await);
        let now = Utc::now();

        ledger
            .apply_payment("SUB-WARKOP-1", "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();
        ledger
            .apply_payment("SUB-WARKOP-2", "warkop", &STARTER, 99_000, now)
            .await
            .unwrap();

        assert_eq!(ledger.order_lock_count().await, 0);
    }

    #[tokio::test]
    async fn order_locks_drain_after_concurrent_duplicates() {
        let ledger = Arc::new(SubscriptionLedger::new(store_with_tenant().await));

        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_payment(ORDER, "warkop", &STARTER, 99_000, now)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.order_lock_count().await, 0);
    }
}
