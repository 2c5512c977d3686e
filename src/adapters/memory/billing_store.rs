//! In-memory implementation of BillingStore.
//!
//! Mirrors the transactional semantics of the PostgreSQL adapter: the upgrade
//! commit writes the tenant and flips the attempt marker under one write
//! lock, so concurrent callers observe exactly one `Applied` and exactly one
//! surviving tenant write.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::billing::{BillingError, Tenant};
use crate::ports::{BillingStore, MarkOutcome, PaymentAttempt};

#[derive(Default)]
struct State {
    tenants: HashMap<String, Tenant>,
    attempts: HashMap<String, PaymentAttempt>,
}

/// In-memory billing store holding both tables behind one `RwLock`.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: RwLock<State>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tenant, overwriting any existing entry with the same slug.
    pub async fn insert_tenant(&self, tenant: Tenant) {
        self.state
            .write()
            .await
            .tenants
            .insert(tenant.slug.clone(), tenant);
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn find_tenant(&self, slug: &str) -> Result<Option<Tenant>, BillingError> {
        Ok(self.state.read().await.tenants.get(slug).cloned())
    }

    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), BillingError> {
        let mut state = self.state.write().await;
        state
            .attempts
            .entry(attempt.merchant_order_id.clone())
            .or_insert_with(|| attempt.clone());
        Ok(())
    }

    async fn find_attempt(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, BillingError> {
        Ok(self.state.read().await.attempts.get(merchant_order_id).cloned())
    }

    async fn commit_upgrade(
        &self,
        tenant: &Tenant,
        merchant_order_id: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<MarkOutcome, BillingError> {
        let mut state = self.state.write().await;

        match state.attempts.get(merchant_order_id) {
            None => return Ok(MarkOutcome::NotFound),
            Some(attempt) if attempt.applied_at.is_some() => {
                return Ok(MarkOutcome::AlreadyApplied)
            }
            Some(_) => {}
        }

        if !state.tenants.contains_key(&tenant.slug) {
            return Err(BillingError::TenantNotFound(tenant.slug.clone()));
        }

        state.tenants.insert(tenant.slug.clone(), tenant.clone());
        if let Some(attempt) = state.attempts.get_mut(merchant_order_id) {
            attempt.applied_at = Some(applied_at);
        }

        Ok(MarkOutcome::Applied)
    }
}
