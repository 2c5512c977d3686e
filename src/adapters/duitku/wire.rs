//! Duitku wire types.
//!
//! Serde representations of the gateway's request and response bodies, field
//! names exactly as the gateway spells them. Nothing outside this adapter
//! sees these shapes; the provider normalizes them at the boundary.

use serde::{Deserialize, Serialize};

use crate::domain::billing::CallbackPayload;

/// Legacy inquiry request (`/api/merchant/v2/inquiry`), MD5-signed in the body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub merchant_code: String,
    pub payment_amount: i64,
    pub merchant_order_id: String,
    pub product_details: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub customer_va_name: String,
    pub callback_url: String,
    pub return_url: String,
    pub signature: String,
    /// Expiry window in minutes.
    pub expiry_period: u32,
}

/// Hosted-page invoice request (`/api/merchant/createInvoice`), SHA-256
/// signed via headers rather than a payload field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub payment_amount: i64,
    pub merchant_order_id: String,
    pub product_details: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub customer_va_name: String,
    pub callback_url: String,
    pub return_url: String,
    /// Expiry window in minutes.
    pub expiry_period: u32,
}

/// Invoice response, shared by both endpoint generations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReply {
    pub status_code: String,
    pub status_message: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    /// Invoice amount echoed back on success, e.g. `"99000.00"`.
    #[serde(default)]
    pub amount: Option<String>,
}

/// Transaction status request (`/api/merchant/transactionStatus`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusRequest {
    pub merchant_code: String,
    pub merchant_order_id: String,
    pub signature: String,
}

/// Transaction status response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusReply {
    pub status_code: String,
    pub status_message: String,
    #[serde(default)]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Form-encoded callback body the gateway POSTs to our webhook URL.
///
/// Only the fields the engine authenticates and interprets are captured;
/// the gateway sends more (`productDetail`, `paymentCode`, ...) which serde
/// ignores.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuitkuCallbackForm {
    pub merchant_code: String,
    pub amount: String,
    pub merchant_order_id: String,
    pub signature: String,
    pub result_code: String,
}

impl From<DuitkuCallbackForm> for CallbackPayload {
    fn from(form: DuitkuCallbackForm) -> Self {
        CallbackPayload {
            merchant_order_id: form.merchant_order_id,
            amount: form.amount,
            signature: form.signature,
            result_code: form.result_code,
            merchant_code: form.merchant_code,
        }
    }
}
