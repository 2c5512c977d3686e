//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing
//! API. Amounts never appear in request DTOs; pricing is resolved from the
//! plan catalog server-side.

use serde::{Deserialize, Serialize};

use crate::application::{InvoiceOutcome, LedgerReceipt, SubscriptionInvoice};
use crate::domain::billing::PlanId;
use crate::ports::{PaymentStatus, StatusResult};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a subscription invoice. Deliberately carries no amount.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Tenant purchasing the subscription.
    pub tenant_slug: String,
    /// Plan code (starter, bisnis, lifetime or a legacy alias).
    pub plan: String,
    /// Billing contact email, forwarded to the gateway.
    pub email: String,
    /// Optional contact phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a created invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    pub merchant_order_id: String,
    pub tenant_slug: String,
    pub plan: PlanId,
    pub amount: i64,
    pub payment_url: String,
    pub reference: String,
    /// When the payment link stops working (ISO 8601).
    pub expires_at: String,
}

impl From<SubscriptionInvoice> for InvoiceResponse {
    fn from(invoice: SubscriptionInvoice) -> Self {
        Self {
            merchant_order_id: invoice.merchant_order_id,
            tenant_slug: invoice.tenant_slug,
            plan: invoice.plan_id,
            amount: invoice.amount,
            payment_url: invoice.payment_url,
            reference: invoice.provider_reference,
            expires_at: invoice.expires_at.to_rfc3339(),
        }
    }
}

/// Response when the provider declined to issue an invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRejectedResponse {
    pub status_code: String,
    pub status_message: String,
}

/// Untagged invoice outcome body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateInvoiceResponse {
    Issued(InvoiceResponse),
    Rejected(InvoiceRejectedResponse),
}

impl From<InvoiceOutcome> for CreateInvoiceResponse {
    fn from(outcome: InvoiceOutcome) -> Self {
        match outcome {
            InvoiceOutcome::Issued(invoice) => Self::Issued(invoice.into()),
            InvoiceOutcome::Rejected {
                status_code,
                status_message,
            } => Self::Rejected(InvoiceRejectedResponse {
                status_code,
                status_message,
            }),
        }
    }
}

/// Response after a callback was applied to the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackAppliedResponse {
    pub tenant_slug: String,
    pub status: String,
    pub subscription_expires_at: Option<String>,
    pub newly_applied: bool,
}

impl From<LedgerReceipt> for CallbackAppliedResponse {
    fn from(receipt: LedgerReceipt) -> Self {
        Self {
            tenant_slug: receipt.tenant_slug,
            status: receipt.status.as_str().to_string(),
            subscription_expires_at: receipt
                .subscription_expires_at
                .map(|at| at.to_rfc3339()),
            newly_applied: receipt.newly_applied,
        }
    }
}

/// Response for a transaction status query.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionStatusResponse {
    pub merchant_order_id: String,
    pub status: String,
    pub amount: Option<i64>,
    pub reference: Option<String>,
    pub status_message: String,
}

impl From<StatusResult> for TransactionStatusResponse {
    fn from(result: StatusResult) -> Self {
        let status = match &result.status {
            PaymentStatus::Paid => "paid".to_string(),
            PaymentStatus::Pending => "pending".to_string(),
            PaymentStatus::Canceled => "canceled".to_string(),
            PaymentStatus::Unknown(code) => format!("unknown({})", code),
        };
        Self {
            merchant_order_id: result.merchant_order_id,
            status,
            amount: result.amount,
            reference: result.provider_reference,
            status_message: result.status_message,
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
