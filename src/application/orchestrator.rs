//! Payment orchestrator.
//!
//! Drives the three-step subscription flow: create an invoice for a tenant,
//! process the gateway's payment callback, and answer status queries. Amounts
//! are always priced server-side from the plan catalog; nothing a client
//! sends can influence what gets invoiced.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::billing::{
    BillingError, CallbackPayload, MerchantOrderId, OrderIdGenerator, Plan, PlanCatalog, PlanId,
};
use crate::ports::{
    BillingStore, InvoiceRequest, InvoiceResponse, PaymentAttempt, StatusResult,
};

use super::gateway::PaymentGateway;
use super::ledger::{LedgerReceipt, SubscriptionLedger};

/// Invoice URLs and expiry shared by every invoice this node creates.
#[derive(Debug, Clone)]
pub struct InvoiceSettings {
    pub callback_url: String,
    pub return_url: String,
    pub expiry_minutes: u32,
}

/// Request to create a subscription invoice. Carries no amount; the plan
/// code is resolved against the catalog server-side.
#[derive(Debug, Clone)]
pub struct CreateInvoiceCommand {
    pub tenant_slug: String,
    pub plan_code: String,
    pub email: String,
    pub phone_number: Option<String>,
}

/// A successfully issued subscription invoice.
#[derive(Debug, Clone)]
pub struct SubscriptionInvoice {
    pub merchant_order_id: String,
    pub tenant_slug: String,
    pub plan_id: PlanId,
    pub amount: i64,
    pub payment_url: String,
    pub provider_reference: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of invoice creation. A provider decline is a value, not an error.
#[derive(Debug, Clone)]
pub enum InvoiceOutcome {
    Issued(SubscriptionInvoice),
    Rejected {
        status_code: String,
        status_message: String,
    },
}

/// Outcome of processing an authentic callback.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// Successful payment posted to the ledger (or confirmed already posted).
    Applied(LedgerReceipt),

    /// Authentic callback reporting a non-success result code. Acknowledged
    /// without touching the tenant.
    NotYetPaid {
        merchant_order_id: String,
        result_code: String,
    },
}

/// Coordinates the invoice, callback and status operations.
pub struct PaymentOrchestrator {
    gateway: PaymentGateway,
    ledger: SubscriptionLedger,
    store: Arc<dyn BillingStore>,
    order_ids: OrderIdGenerator,
    settings: InvoiceSettings,
}

impl PaymentOrchestrator {
    pub fn new(
        gateway: PaymentGateway,
        store: Arc<dyn BillingStore>,
        settings: InvoiceSettings,
    ) -> Self {
        let ledger = SubscriptionLedger::new(store.clone());
        Self {
            gateway,
            ledger,
            store,
            order_ids: OrderIdGenerator::new(),
            settings,
        }
    }

    /// Creates a payment invoice for a tenant's plan purchase.
    pub async fn create_subscription_invoice(
        &self,
        command: CreateInvoiceCommand,
    ) -> Result<InvoiceOutcome, BillingError> {
        let tenant = self
            .store
            .find_tenant(&command.tenant_slug)
            .await?
            .ok_or_else(|| BillingError::TenantNotFound(command.tenant_slug.clone()))?;

        let plan = PlanCatalog::resolve(&command.plan_code);
        let order_id = self.order_ids.next(&tenant.slug);

        // Recorded before the provider call so the callback path can always
        // correlate, even if the provider reply is lost to a timeout.
        self.store
            .record_attempt(&PaymentAttempt::new(
                order_id.as_str(),
                &tenant.slug,
                plan.id,
                plan.amount,
                Utc::now(),
            ))
            .await?;

        let request = InvoiceRequest {
            merchant_order_id: order_id.as_str().to_string(),
            amount: plan.amount,
            product_details: format!("Langganan Kasir {}", plan.description),
            email: command.email,
            customer_name: tenant.name.clone(),
            phone_number: command.phone_number,
            callback_url: self.settings.callback_url.clone(),
            return_url: self.settings.return_url.clone(),
            expiry_minutes: self.settings.expiry_minutes,
        };

        match self.gateway.create_invoice(&request).await? {
            InvoiceResponse::Issued(invoice) => {
                tracing::info!(
                    tenant_slug = %tenant.slug,
                    merchant_order_id = %order_id.as_str(),
                    plan = plan.id.as_str(),
                    amount = plan.amount,
                    "Subscription invoice issued"
                );
                Ok(InvoiceOutcome::Issued(SubscriptionInvoice {
                    merchant_order_id: order_id.as_str().to_string(),
                    tenant_slug: tenant.slug,
                    plan_id: plan.id,
                    amount: plan.amount,
                    payment_url: invoice.payment_url,
                    provider_reference: invoice.provider_reference,
                    expires_at: invoice.expires_at,
                }))
            }
            InvoiceResponse::Rejected {
                status_code,
                status_message,
            } => {
                tracing::warn!(
                    tenant_slug = %tenant.slug,
                    merchant_order_id = %order_id.as_str(),
                    status_code = %status_code,
                    "Provider declined invoice"
                );
                Ok(InvoiceOutcome::Rejected {
                    status_code,
                    status_message,
                })
            }
        }
    }

    /// Processes a gateway payment callback.
    ///
    /// Verification failures and amount mismatches surface as errors; the
    /// HTTP layer maps them to acknowledgment statuses. Authentic non-success
    /// callbacks are acknowledged without any ledger write.
    pub async fn process_callback(
        &self,
        payload: &CallbackPayload,
    ) -> Result<CallbackOutcome, BillingError> {
        let verified = self.gateway.verify_callback(payload)?;

        if !verified.is_payment_success {
            tracing::info!(
                merchant_order_id = %verified.merchant_order_id,
                result_code = %verified.result_code,
                "Authentic callback without payment success"
            );
            return Ok(CallbackOutcome::NotYetPaid {
                merchant_order_id: verified.merchant_order_id,
                result_code: verified.result_code,
            });
        }

        let order_id = MerchantOrderId::parse(&verified.merchant_order_id)?;

        let attempt = self.store.find_attempt(order_id.as_str()).await?;
        if let Some(attempt) = &attempt {
            // Signed amount must match what we invoiced. A mismatch on an
            // authentic signature means provider-side tampering or a stale
            // replay against a re-priced plan.
            if attempt.amount != verified.amount {
                return Err(BillingError::AmountMismatch {
                    expected: attempt.amount,
                    received: payload.amount.clone(),
                });
            }
        }

        let plan = self.resolve_callback_plan(attempt.as_ref(), verified.amount);

        let receipt = self
            .ledger
            .apply_payment(
                order_id.as_str(),
                order_id.tenant_slug(),
                plan,
                verified.amount,
                Utc::now(),
            )
            .await?;

        Ok(CallbackOutcome::Applied(receipt))
    }

    /// Queries the provider for the current state of an order.
    pub async fn check_status(
        &self,
        merchant_order_id: &str,
    ) -> Result<StatusResult, BillingError> {
        MerchantOrderId::parse(merchant_order_id)?;
        self.gateway.check_status(merchant_order_id).await
    }

    /// Determines which plan a callback pays for. The attempt row is
    /// authoritative; amount lookup covers unrecorded orders; the default
    /// plan is the last resort for a paid amount nothing matches.
    fn resolve_callback_plan(
        &self,
        attempt: Option<&PaymentAttempt>,
        amount: i64,
    ) -> &'static Plan {
        if let Some(attempt) = attempt {
            return PlanCatalog::resolve(attempt.plan_id.as_str());
        }
        match PlanCatalog::find_by_amount(amount) {
            Some(plan) => plan,
            None => {
                tracing::warn!(
                    amount,
                    "Paid amount matches no catalog plan, falling back to default"
                );
                PlanCatalog::DEFAULT
            }
        }
    }
}
