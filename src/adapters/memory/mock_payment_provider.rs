//! Mock payment provider for tests and local development.
//!
//! Issues fake invoices without any network calls and verifies callbacks
//! with the same signature scheme as the real gateway, so end-to-end flows
//! can exercise genuine digests against a known test key.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::adapters::duitku::signature;
use crate::domain::billing::{BillingError, CallbackPayload, VerificationResult};
use crate::ports::{
    InvoiceRequest, InvoiceResponse, IssuedInvoice, PaymentProvider, PaymentStatus, StatusResult,
};

/// Scripted payment provider. Every invoice succeeds unless `rejecting` is
/// set; callbacks are verified against the configured merchant credentials.
pub struct MockPaymentProvider {
    merchant_code: String,
    api_key: String,
    rejecting: bool,
    invoice_counter: AtomicU64,
}

impl MockPaymentProvider {
    pub fn new(merchant_code: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            merchant_code: merchant_code.into(),
            api_key: api_key.into(),
            rejecting: false,
            invoice_counter: AtomicU64::new(0),
        }
    }

    /// Makes every subsequent invoice attempt come back as a rejection.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    /// Number of invoices issued so far.
    pub fn invoices_issued(&self) -> u64 {
        self.invoice_counter.load(Ordering::SeqCst)
    }

    /// Builds an authentic callback for an order, signed with this
    /// provider's key. Tests use it to simulate gateway deliveries.
    pub fn signed_callback(
        &self,
        merchant_order_id: &str,
        amount: &str,
        result_code: &str,
    ) -> CallbackPayload {
        CallbackPayload {
            merchant_order_id: merchant_order_id.to_string(),
            amount: amount.to_string(),
            signature: signature::callback_signature(
                &self.merchant_code,
                amount,
                merchant_order_id,
                &self.api_key,
            ),
            result_code: result_code.to_string(),
            merchant_code: self.merchant_code.clone(),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResponse, BillingError> {
        if self.rejecting {
            return Ok(InvoiceResponse::Rejected {
                status_code: "02".to_string(),
                status_message: "mock rejection".to_string(),
            });
        }

        let n = self.invoice_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InvoiceResponse::Issued(IssuedInvoice {
            payment_url: format!("https://mock.invalid/pay/{}", request.merchant_order_id),
            provider_reference: format!("MOCKREF{:08}", n),
            amount: request.amount,
            status_code: "00".to_string(),
            status_message: "SUCCESS".to_string(),
            expires_at: Utc::now() + Duration::minutes(i64::from(request.expiry_minutes)),
        }))
    }

    fn verify_callback(
        &self,
        payload: &CallbackPayload,
    ) -> Result<VerificationResult, BillingError> {
        if payload.merchant_code != self.merchant_code {
            return Err(BillingError::InvalidMerchantCode);
        }

        let expected = signature::callback_signature(
            &self.merchant_code,
            &payload.amount,
            &payload.merchant_order_id,
            &self.api_key,
        );
        if !signature::signatures_match(&expected, &payload.signature) {
            return Err(BillingError::InvalidSignature);
        }

        Ok(VerificationResult {
            is_payment_success: payload.reports_success(),
            merchant_order_id: payload.merchant_order_id.clone(),
            amount: payload.amount_minor_units()?,
            result_code: payload.result_code.clone(),
        })
    }

    async fn check_status(&self, merchant_order_id: &str) -> Result<StatusResult, BillingError> {
        Ok(StatusResult {
            merchant_order_id: merchant_order_id.to_string(),
            status: PaymentStatus::Pending,
            amount: None,
            provider_reference: None,
            status_message: "mock".to_string(),
        })
    }
}
