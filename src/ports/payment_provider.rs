//! Payment provider port.
//!
//! Contract every payment gateway integration implements. The rest of the
//! system only ever sees this trait; adding a second provider must require
//! zero changes to the gateway or the orchestrator.
//!
//! # Design
//!
//! - **Gateway agnostic**: field names and signature schemes stay inside the
//!   concrete adapter; callers work with normalized types.
//! - **Rejection is not an error**: a clean provider-side decline comes back
//!   as [`InvoiceResponse::Rejected`], never as an `Err`. Errors are reserved
//!   for transport and protocol failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, CallbackPayload, VerificationResult};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted invoice for one subscription upgrade attempt.
    ///
    /// One outbound HTTPS call. Fails with
    /// [`BillingError::ProviderTransport`] on network or timeout problems;
    /// a provider-reported business rejection is returned as
    /// [`InvoiceResponse::Rejected`].
    async fn create_invoice(&self, request: &InvoiceRequest)
        -> Result<InvoiceResponse, BillingError>;

    /// Authenticates an inbound callback.
    ///
    /// Checks the merchant identifier first (distinct error for
    /// observability), then the signature. Only then is the result code
    /// interpreted. Pure computation, no I/O.
    fn verify_callback(&self, payload: &CallbackPayload)
        -> Result<VerificationResult, BillingError>;

    /// Polls the provider for the status of an order.
    ///
    /// Reconciliation fallback for invoices whose callback never arrived.
    async fn check_status(&self, merchant_order_id: &str) -> Result<StatusResult, BillingError>;
}

/// Request to create a provider-hosted invoice.
///
/// The amount is always resolved server-side from the plan catalog before
/// this struct is built; no client-supplied amount ever reaches a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Correlation key, `SUB-<SLUG>-<MILLIS>`.
    pub merchant_order_id: String,

    /// Amount in minor units.
    pub amount: i64,

    /// Product description shown on the hosted payment page.
    pub product_details: String,

    /// Customer email, required by most gateways.
    pub email: String,

    /// Customer display name.
    pub customer_name: String,

    /// Customer phone number, if known.
    pub phone_number: Option<String>,

    /// Publicly reachable URL the provider calls back on completion.
    pub callback_url: String,

    /// URL the customer's browser returns to after payment.
    pub return_url: String,

    /// Invoice validity window in minutes.
    pub expiry_minutes: u32,
}

/// Invoice successfully issued by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedInvoice {
    /// Hosted payment page URL to redirect the customer to.
    pub payment_url: String,

    /// Provider's own reference for the invoice.
    pub provider_reference: String,

    /// Amount the provider will collect, minor units.
    pub amount: i64,

    /// Raw provider status code (`"00"` on success).
    pub status_code: String,

    /// Raw provider status message.
    pub status_message: String,

    /// When the invoice stops being payable.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of an invoice creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InvoiceResponse {
    /// The provider issued the invoice.
    Issued(IssuedInvoice),

    /// The provider declined the request at the business level.
    /// Not retryable with the same parameters.
    Rejected {
        status_code: String,
        status_message: String,
    },
}

impl InvoiceResponse {
    /// Returns true if an invoice was issued.
    pub fn is_issued(&self) -> bool {
        matches!(self, InvoiceResponse::Issued(_))
    }
}

/// Payment state reported by the provider's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment completed.
    Paid,

    /// Invoice issued, payment not received yet.
    Pending,

    /// Invoice expired or was canceled.
    Canceled,

    /// Status code this integration does not recognize.
    Unknown(String),
}

/// Result of a status reconciliation poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    /// Order id the status refers to.
    pub merchant_order_id: String,

    /// Normalized payment state.
    pub status: PaymentStatus,

    /// Amount reported by the provider, when present.
    pub amount: Option<i64>,

    /// Provider's own reference, when present.
    pub provider_reference: Option<String>,

    /// Raw provider status message, for logs.
    pub status_message: String,
}
