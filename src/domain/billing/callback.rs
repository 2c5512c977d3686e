//! Callback payload and verification result types.
//!
//! Everything in [`CallbackPayload`] crosses the trust boundary: every field
//! is attacker-controllable until the provider signature check passes.

use serde::{Deserialize, Serialize};

use super::errors::BillingError;

/// Result code the reference provider uses for a completed payment.
pub const RESULT_CODE_SUCCESS: &str = "00";

/// Normalized, still-untrusted webhook payload from a payment provider.
///
/// The amount is kept as the raw string received on the wire because the
/// provider computes its callback digest over that exact string; re-rendering
/// a parsed number could change the bytes being authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// Order id we generated at invoice time, echoed back by the provider.
    pub merchant_order_id: String,

    /// Paid amount as received, minor units rendered as a decimal string.
    pub amount: String,

    /// Provider signature over the payload fields.
    pub signature: String,

    /// Provider result code; [`RESULT_CODE_SUCCESS`] means paid.
    pub result_code: String,

    /// Merchant identifier the provider believes it is calling.
    pub merchant_code: String,
}

impl CallbackPayload {
    /// Parses the amount into minor units.
    ///
    /// Some gateways render amounts with a trailing `.00`; that suffix is
    /// tolerated, anything else must be a plain integer.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Parse`] when the amount is not an integer.
    pub fn amount_minor_units(&self) -> Result<i64, BillingError> {
        let trimmed = self.amount.strip_suffix(".00").unwrap_or(&self.amount);
        trimmed
            .parse()
            .map_err(|_| BillingError::Parse(format!("invalid amount: {}", self.amount)))
    }

    /// Returns true if the (not yet authenticated) payload reports success.
    pub fn reports_success(&self) -> bool {
        self.result_code == RESULT_CODE_SUCCESS
    }
}

/// Outcome of verifying a callback.
///
/// `is_payment_success` is only meaningful once verification succeeded: the
/// first says "this callback is authentic and well-formed", the second says
/// "the authenticated callback reports a completed payment". The two are
/// never conflated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the authenticated callback reports a completed payment.
    pub is_payment_success: bool,

    /// Order id from the verified payload.
    pub merchant_order_id: String,

    /// Amount from the verified payload, minor units.
    pub amount: i64,

    /// Raw provider result code, for logs and reconciliation.
    pub result_code: String,
}
