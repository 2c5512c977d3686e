//! End-to-end subscription payment flow over in-memory adapters.
//!
//! Exercises the full create-invoice, receive-callback, upgrade-tenant path
//! with genuine MD5 callback signatures, including hostile and concurrent
//! deliveries.

use std::sync::Arc;

use chrono::{Duration, Utc};

use kasir_billing::adapters::memory::{InMemoryBillingStore, MockPaymentProvider};
use kasir_billing::application::{
    CallbackOutcome, CreateInvoiceCommand, InvoiceOutcome, InvoiceSettings, PaymentGateway,
    PaymentOrchestrator, SubscriptionInvoice,
};
use kasir_billing::domain::billing::{BillingError, SubscriptionStatus, Tenant};
use kasir_billing::ports::BillingStore;

const MERCHANT_CODE: &str = "D12345";
const API_KEY: &str = "test-api-key-12345";

struct TestHarness {
    orchestrator: Arc<PaymentOrchestrator>,
    provider: Arc<MockPaymentProvider>,
    store: Arc<InMemoryBillingStore>,
}

fn invoice_settings() -> InvoiceSettings {
    InvoiceSettings {
        callback_url: "https://kasir.test/api/billing/callback".to_string(),
        return_url: "https://kasir.test/billing/done".to_string(),
        expiry_minutes: 1440,
    }
}

async fn harness() -> TestHarness {
    let provider = Arc::new(MockPaymentProvider::new(MERCHANT_CODE, API_KEY));
    let store = Arc::new(InMemoryBillingStore::new());
    store
        .insert_tenant(Tenant::trial("warkopjakarta", "Warkop Jakarta"))
        .await;

    let orchestrator = PaymentOrchestrator::new(
        PaymentGateway::new(provider.clone()),
        store.clone(),
        invoice_settings(),
    );

    TestHarness {
        orchestrator: Arc::new(orchestrator),
        provider,
        store,
    }
}

async fn issue_invoice(harness: &TestHarness, plan: &str) -> SubscriptionInvoice {
    let outcome = harness
        .orchestrator
        .create_subscription_invoice(CreateInvoiceCommand {
            tenant_slug: "warkopjakarta".to_string(),
            plan_code: plan.to_string(),
            email: "owner@warkop.id".to_string(),
            phone_number: None,
        })
        .await
        .unwrap();

    match outcome {
        InvoiceOutcome::Issued(invoice) => invoice,
        InvoiceOutcome::Rejected { status_message, .. } => {
            panic!("invoice rejected: {}", status_message)
        }
    }
}

#[tokio::test]
async fn paid_callback_upgrades_trial_tenant() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "bisnis").await;
    assert_eq!(invoice.amount, 249_000);

    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "249000", "00");
    let outcome = h.orchestrator.process_callback(&payload).await.unwrap();

    let CallbackOutcome::Applied(receipt) = outcome else {
        panic!("expected applied outcome");
    };
    assert!(receipt.newly_applied);

    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    assert_eq!(tenant.status, SubscriptionStatus::Paid);
    let expires = tenant.subscription_expires_at.unwrap();
    assert!(expires > Utc::now() + Duration::days(29));
    assert!(expires < Utc::now() + Duration::days(31));
}

#[tokio::test]
async fn amount_with_decimal_suffix_is_accepted() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "starter").await;

    // Gateways deliver "99000.00" for a 99000 invoice; the signature covers
    // the raw string, the comparison uses the parsed value.
    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000.00", "00");
    let outcome = h.orchestrator.process_callback(&payload).await.unwrap();
    assert!(matches!(outcome, CallbackOutcome::Applied(_)));
}

#[tokio::test]
async fn renewal_extends_from_current_expiry() {
    let h = harness().await;

    let first = issue_invoice(&h, "starter").await;
    let payload = h
        .provider
        .signed_callback(&first.merchant_order_id, "99000", "00");
    h.orchestrator.process_callback(&payload).await.unwrap();

    let after_first = h
        .store
        .find_tenant("warkopjakarta")
        .await
        .unwrap()
        .unwrap()
        .subscription_expires_at
        .unwrap();

    // Renew well before expiry: the new period stacks on the old one.
    let second = issue_invoice(&h, "starter").await;
    let payload = h
        .provider
        .signed_callback(&second.merchant_order_id, "99000", "00");
    h.orchestrator.process_callback(&payload).await.unwrap();

    let after_second = h
        .store
        .find_tenant("warkopjakarta")
        .await
        .unwrap()
        .unwrap()
        .subscription_expires_at
        .unwrap();
    assert_eq!(after_second, after_first + Duration::days(30));
}

#[tokio::test]
async fn duplicate_deliveries_upgrade_exactly_once() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "starter").await;
    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000", "00");

    let mut handles = Vec::new();
    for _ in 0..12 {
        let orchestrator = Arc::clone(&h.orchestrator);
        let payload = payload.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.process_callback(&payload).await.unwrap()
        }));
    }

    let mut newly_applied = 0;
    for handle in handles {
        if let CallbackOutcome::Applied(receipt) = handle.await.unwrap() {
            if receipt.newly_applied {
                newly_applied += 1;
            }
        }
    }
    assert_eq!(newly_applied, 1);

    // One 30-day period, not twelve.
    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    assert!(tenant.subscription_expires_at.unwrap() < Utc::now() + Duration::days(31));
}

#[tokio::test]
async fn replicated_deliveries_extend_one_period() {
    let h = harness().await;

    // A second orchestrator over the same store and provider, as a second
    // server replica behind the load balancer. Its in-process order lock is
    // independent, so only the store's transactional commit stands between
    // a redelivered callback and a double extension.
    let replica = Arc::new(PaymentOrchestrator::new(
        PaymentGateway::new(h.provider.clone()),
        h.store.clone(),
        invoice_settings(),
    ));

    let invoice = issue_invoice(&h, "starter").await;
    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000", "00");

    let mut handles = Vec::new();
    for i in 0..10 {
        let orchestrator = if i % 2 == 0 {
            Arc::clone(&h.orchestrator)
        } else {
            Arc::clone(&replica)
        };
        let payload = payload.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.process_callback(&payload).await.unwrap()
        }));
    }

    let mut newly_applied = 0;
    for handle in handles {
        if let CallbackOutcome::Applied(receipt) = handle.await.unwrap() {
            if receipt.newly_applied {
                newly_applied += 1;
            }
        }
    }
    assert_eq!(newly_applied, 1);

    // Exactly one 30-day period across both replicas.
    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    let expires = tenant.subscription_expires_at.unwrap();
    assert!(expires > Utc::now() + Duration::days(29));
    assert!(expires < Utc::now() + Duration::days(31));
}

#[tokio::test]
async fn forged_callback_leaves_tenant_untouched() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "starter").await;

    let mut payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000", "00");
    payload.signature = "f".repeat(32);

    let err = h.orchestrator.process_callback(&payload).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidSignature));
    assert!(err.is_security_event());
    assert_eq!(err.callback_ack_status(), axum::http::StatusCode::OK);

    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    assert_eq!(tenant.status, SubscriptionStatus::Trial);
    assert!(tenant.subscription_expires_at.is_none());
}

#[tokio::test]
async fn underpaid_callback_with_valid_signature_is_rejected() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "bisnis").await;

    // Authentic signature over a lower amount than the invoiced 249000.
    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000", "00");

    let err = h.orchestrator.process_callback(&payload).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::AmountMismatch {
            expected: 249_000,
            ..
        }
    ));

    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    assert_eq!(tenant.status, SubscriptionStatus::Trial);
}

#[tokio::test]
async fn pending_result_code_acknowledged_without_upgrade() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "starter").await;

    let payload = h
        .provider
        .signed_callback(&invoice.merchant_order_id, "99000", "01");
    let outcome = h.orchestrator.process_callback(&payload).await.unwrap();

    assert!(matches!(outcome, CallbackOutcome::NotYetPaid { .. }));
    let tenant = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    assert_eq!(tenant.status, SubscriptionStatus::Trial);
}

#[tokio::test]
async fn callback_for_deleted_tenant_is_unprocessable() {
    let h = harness().await;
    let invoice = issue_invoice(&h, "starter").await;

    // Simulate the tenant disappearing between invoice and callback by
    // pointing the order id at a slug that was never seeded.
    let order_id = invoice
        .merchant_order_id
        .replace("WARKOPJAKARTA", "GONECAFE");
    let payload = h.provider.signed_callback(&order_id, "99000", "00");

    let err = h.orchestrator.process_callback(&payload).await.unwrap_err();
    assert!(matches!(err, BillingError::TenantNotFound(_)));
    // Acknowledged: redelivering cannot make the tenant reappear.
    assert_eq!(err.callback_ack_status(), axum::http::StatusCode::OK);
    // And no orphan attempt row was written for the missing tenant.
    assert!(h.store.find_attempt(&order_id).await.unwrap().is_none());
}

#[tokio::test]
async fn two_tenants_upgrade_independently() {
    let h = harness().await;
    h.store.insert_tenant(Tenant::trial("kopikita", "Kopi Kita")).await;

    let invoice_a = issue_invoice(&h, "starter").await;
    let outcome_b = h
        .orchestrator
        .create_subscription_invoice(CreateInvoiceCommand {
            tenant_slug: "kopikita".to_string(),
            plan_code: "lifetime".to_string(),
            email: "owner@kopikita.id".to_string(),
            phone_number: None,
        })
        .await
        .unwrap();
    let InvoiceOutcome::Issued(invoice_b) = outcome_b else {
        panic!("expected issued invoice");
    };

    assert_ne!(invoice_a.merchant_order_id, invoice_b.merchant_order_id);

    // Only tenant B pays.
    let payload = h
        .provider
        .signed_callback(&invoice_b.merchant_order_id, "2499000", "00");
    h.orchestrator.process_callback(&payload).await.unwrap();

    let a = h.store.find_tenant("warkopjakarta").await.unwrap().unwrap();
    let b = h.store.find_tenant("kopikita").await.unwrap().unwrap();
    assert_eq!(a.status, SubscriptionStatus::Trial);
    assert_eq!(b.status, SubscriptionStatus::Paid);
    assert!(b.subscription_expires_at.unwrap() > Utc::now() + Duration::days(3000));
}
