//! Billing error taxonomy.
//!
//! One enum covers both directions of the payment engine: outbound invoice
//! creation (transport and provider rejections) and inbound callback
//! processing (authentication failures, format errors). The callback path
//! carries its own HTTP acknowledgement mapping: an inauthentic callback is
//! acknowledged with 2xx so the provider stops retrying a forged request,
//! while genuine server faults return 5xx to invite a retry.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors from payment engine operations.
#[derive(Debug, Error)]
pub enum BillingError {
    /// No tenant exists for the given slug. Fatal to the request, never to
    /// the process; on the callback path it is acknowledged to stop retries.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Merchant order id does not match `SUB-<SLUG>-<MILLIS>`.
    #[error("Malformed merchant order id: {0}")]
    OrderIdFormat(String),

    /// Network or timeout failure talking to the provider. Retryable; the
    /// invoice may still have been created provider-side, so recovery is a
    /// status poll, not a blind retry.
    #[error("Provider transport failure: {0}")]
    ProviderTransport(String),

    /// Provider-reported business rejection (non-zero status code). Not
    /// retryable with the same parameters.
    #[error("Provider rejected request: {code} {message}")]
    ProviderRejection { code: String, message: String },

    /// Callback carried a merchant code other than ours.
    #[error("Callback authentication failed: invalid merchant code")]
    InvalidMerchantCode,

    /// Callback signature did not match the expected digest.
    #[error("Callback authentication failed: invalid signature")]
    InvalidSignature,

    /// Authentic callback whose amount differs from the invoice we issued.
    #[error("Callback amount {received} does not match invoiced amount {expected}")]
    AmountMismatch { expected: i64, received: String },

    /// Callback payload could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Persistence failure. Retryable.
    #[error("Database error: {0}")]
    Database(String),
}

impl BillingError {
    /// Returns true if the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::ProviderTransport(_) | BillingError::Database(_)
        )
    }

    /// Returns true if this failure should be logged as a security event.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            BillingError::InvalidMerchantCode
                | BillingError::InvalidSignature
                | BillingError::AmountMismatch { .. }
        )
    }

    /// Maps the error to the HTTP status the callback handler answers with.
    ///
    /// The provider retries on 5xx. Anything inauthentic or unrecoverable is
    /// therefore acknowledged with 2xx (after logging): a 5xx for a forged
    /// request would only invite redeliveries of that forged request.
    pub fn callback_ack_status(&self) -> StatusCode {
        match self {
            // Inauthentic or permanently unprocessable - acknowledge and drop.
            BillingError::InvalidMerchantCode
            | BillingError::InvalidSignature
            | BillingError::AmountMismatch { .. }
            | BillingError::TenantNotFound(_)
            | BillingError::OrderIdFormat(_) => StatusCode::OK,

            // Malformed body - not a provider retry we want.
            BillingError::Parse(_) => StatusCode::BAD_REQUEST,

            // Transient server faults - let the provider redeliver.
            BillingError::Database(_)
            | BillingError::ProviderTransport(_)
            | BillingError::ProviderRejection { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
