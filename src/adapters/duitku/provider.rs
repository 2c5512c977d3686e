//! Duitku payment provider adapter.
//!
//! Implements the `PaymentProvider` trait for the Duitku gateway. Supports
//! both endpoint generations the gateway exposes simultaneously: the legacy
//! MD5-signed inquiry endpoint and the SHA-256 header-signed hosted-page
//! endpoint. Which one an instance calls is fixed at construction, as is the
//! sandbox/production base URL - a live instance can never flip modes.
//!
//! # Security
//!
//! - Callback verification checks the merchant identifier before the
//!   signature, so the two failure modes are distinguishable in logs
//! - Signature comparison is constant-time
//! - The API key is a `secrecy::SecretString` and never logged

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::{BillingError, CallbackPayload, VerificationResult};
use crate::ports::{
    InvoiceRequest, InvoiceResponse, IssuedInvoice, PaymentProvider, PaymentStatus, StatusResult,
};

use super::signature;
use super::wire::{
    CreateInvoiceRequest, InquiryRequest, InvoiceReply, TransactionStatusReply,
    TransactionStatusRequest,
};

/// Gateway environment. Selects base URLs at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuitkuMode {
    /// sandbox.duitku.com / api-sandbox.duitku.com
    Sandbox,

    /// passport.duitku.com / api-prod.duitku.com
    Production,
}

/// Which endpoint generation this instance calls for invoice creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointGeneration {
    /// Legacy `/webapi/api/merchant/v2/inquiry`, MD5 signature in the body.
    LegacyInquiry,

    /// Hosted-page `/api/merchant/createInvoice`, SHA-256 signature headers.
    HostedPage,
}

/// Duitku adapter configuration.
#[derive(Clone)]
pub struct DuitkuConfig {
    merchant_code: String,
    api_key: SecretString,
    mode: DuitkuMode,
    generation: EndpointGeneration,
    legacy_base_url: String,
    hosted_base_url: String,
    timeout_secs: u64,
}

impl DuitkuConfig {
    /// Creates a configuration for the given environment.
    pub fn new(
        merchant_code: impl Into<String>,
        api_key: impl Into<String>,
        mode: DuitkuMode,
        generation: EndpointGeneration,
    ) -> Self {
        let (legacy, hosted) = match mode {
            DuitkuMode::Sandbox => (
                "https://sandbox.duitku.com/webapi",
                "https://api-sandbox.duitku.com",
            ),
            DuitkuMode::Production => (
                "https://passport.duitku.com/webapi",
                "https://api-prod.duitku.com",
            ),
        };

        Self {
            merchant_code: merchant_code.into(),
            api_key: SecretString::new(api_key.into()),
            mode,
            generation,
            legacy_base_url: legacy.to_string(),
            hosted_base_url: hosted.to_string(),
            timeout_secs: 8,
        }
    }

    /// Overrides both base URLs (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.legacy_base_url = url.clone();
        self.hosted_base_url = url;
        self
    }

    /// Overrides the outbound call timeout. Provider calls in this domain
    /// should stay bounded to single-digit seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Returns the environment this configuration targets.
    pub fn mode(&self) -> DuitkuMode {
        self.mode
    }
}

/// Duitku payment provider.
pub struct DuitkuProvider {
    config: DuitkuConfig,
    http_client: reqwest::Client,
}

impl DuitkuProvider {
    /// Creates a provider. The HTTP client carries the configured timeout;
    /// a timed-out call surfaces as a retryable transport error.
    pub fn new(config: DuitkuConfig) -> Result<Self, BillingError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BillingError::ProviderTransport(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn create_invoice_legacy(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResponse, BillingError> {
        let url = format!("{}/api/merchant/v2/inquiry", self.config.legacy_base_url);

        let body = InquiryRequest {
            merchant_code: self.config.merchant_code.clone(),
            payment_amount: request.amount,
            merchant_order_id: request.merchant_order_id.clone(),
            product_details: request.product_details.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            customer_va_name: request.customer_name.clone(),
            callback_url: request.callback_url.clone(),
            return_url: request.return_url.clone(),
            signature: signature::invoice_signature(
                &self.config.merchant_code,
                &request.merchant_order_id,
                request.amount,
                self.config.api_key.expose_secret(),
            ),
            expiry_period: request.expiry_minutes,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        self.interpret_invoice_reply(request, response).await
    }

    async fn create_invoice_hosted(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResponse, BillingError> {
        let url = format!("{}/api/merchant/createInvoice", self.config.hosted_base_url);
        let timestamp_millis = Utc::now().timestamp_millis();

        let body = CreateInvoiceRequest {
            payment_amount: request.amount,
            merchant_order_id: request.merchant_order_id.clone(),
            product_details: request.product_details.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            customer_va_name: request.customer_name.clone(),
            callback_url: request.callback_url.clone(),
            return_url: request.return_url.clone(),
            expiry_period: request.expiry_minutes,
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-duitku-merchantcode", &self.config.merchant_code)
            .header("x-duitku-timestamp", timestamp_millis.to_string())
            .header(
                "x-duitku-signature",
                signature::checkout_signature(
                    &self.config.merchant_code,
                    timestamp_millis,
                    self.config.api_key.expose_secret(),
                ),
            )
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        self.interpret_invoice_reply(request, response).await
    }

    /// Maps the gateway's HTTP/body reply onto the port's outcome type.
    ///
    /// A non-zero gateway status code is a clean business rejection, not an
    /// error. Only transport-level trouble (timeouts, 5xx) is an `Err`.
    async fn interpret_invoice_reply(
        &self,
        request: &InvoiceRequest,
        response: reqwest::Response,
    ) -> Result<InvoiceResponse, BillingError> {
        let http_status = response.status();
        if http_status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %http_status, "Duitku invoice endpoint server error");
            return Err(BillingError::ProviderTransport(format!(
                "HTTP {}: {}",
                http_status, text
            )));
        }

        if !http_status.is_success() {
            // Gateway-level refusal (bad request, auth) - surfaced as a
            // rejection, with the raw body kept for server-side logs only.
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %http_status,
                merchant_order_id = %request.merchant_order_id,
                error = %text,
                "Duitku refused invoice request"
            );
            return Ok(InvoiceResponse::Rejected {
                status_code: http_status.as_str().to_string(),
                status_message: text,
            });
        }

        let reply: InvoiceReply = response
            .json()
            .await
            .map_err(|e| BillingError::Parse(format!("invalid invoice reply: {}", e)))?;

        self.invoice_outcome(request, reply)
    }

    /// Maps a parsed invoice reply body onto the port's outcome type.
    fn invoice_outcome(
        &self,
        request: &InvoiceRequest,
        reply: InvoiceReply,
    ) -> Result<InvoiceResponse, BillingError> {
        if reply.status_code != "00" {
            tracing::warn!(
                merchant_order_id = %request.merchant_order_id,
                status_code = %reply.status_code,
                status_message = %reply.status_message,
                "Duitku rejected invoice"
            );
            return Ok(InvoiceResponse::Rejected {
                status_code: reply.status_code,
                status_message: reply.status_message,
            });
        }

        let payment_url = reply
            .payment_url
            .ok_or_else(|| BillingError::Parse("success reply missing paymentUrl".to_string()))?;
        let provider_reference = reply
            .reference
            .ok_or_else(|| BillingError::Parse("success reply missing reference".to_string()))?;

        // The gateway echoes the invoice amount on success. A disagreement
        // with what we asked for means the payment link would collect the
        // wrong amount; the invoice must not be handed to the tenant.
        if let Some(echoed) = reply.amount.as_deref() {
            if parse_gateway_amount(echoed) != Some(request.amount) {
                tracing::error!(
                    merchant_order_id = %request.merchant_order_id,
                    requested = request.amount,
                    echoed = %echoed,
                    "Duitku echoed a different invoice amount"
                );
                return Err(BillingError::Parse(format!(
                    "invoice reply amount {} does not match requested {}",
                    echoed, request.amount
                )));
            }
        }

        tracing::info!(
            merchant_order_id = %request.merchant_order_id,
            reference = %provider_reference,
            "Duitku invoice issued"
        );

        Ok(InvoiceResponse::Issued(IssuedInvoice {
            payment_url,
            provider_reference,
            amount: request.amount,
            status_code: reply.status_code,
            status_message: reply.status_message,
            expires_at: Utc::now() + Duration::minutes(i64::from(request.expiry_minutes)),
        }))
    }
}

#[async_trait]
impl PaymentProvider for DuitkuProvider {
    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResponse, BillingError> {
        match self.config.generation {
            EndpointGeneration::LegacyInquiry => self.create_invoice_legacy(request).await,
            EndpointGeneration::HostedPage => self.create_invoice_hosted(request).await,
        }
    }

    fn verify_callback(
        &self,
        payload: &CallbackPayload,
    ) -> Result<VerificationResult, BillingError> {
        // 1. Merchant identifier first - a mismatch is a distinct failure
        //    mode and must not fall through to a generic signature error.
        if payload.merchant_code != self.config.merchant_code {
            tracing::warn!(
                received_merchant_code = %payload.merchant_code,
                merchant_order_id = %payload.merchant_order_id,
                "Callback carried invalid merchant code"
            );
            return Err(BillingError::InvalidMerchantCode);
        }

        // 2. Signature over the raw amount string as received.
        let expected = signature::callback_signature(
            &self.config.merchant_code,
            &payload.amount,
            &payload.merchant_order_id,
            self.config.api_key.expose_secret(),
        );

        if !signature::signatures_match(&expected, &payload.signature) {
            tracing::warn!(
                merchant_order_id = %payload.merchant_order_id,
                amount = %payload.amount,
                result_code = %payload.result_code,
                "Callback signature verification failed"
            );
            return Err(BillingError::InvalidSignature);
        }

        // 3. Only an authenticated payload gets its fields interpreted.
        let amount = payload.amount_minor_units()?;

        tracing::debug!(
            merchant_order_id = %payload.merchant_order_id,
            result_code = %payload.result_code,
            "Callback signature verified"
        );

        Ok(VerificationResult {
            is_payment_success: payload.reports_success(),
            merchant_order_id: payload.merchant_order_id.clone(),
            amount,
            result_code: payload.result_code.clone(),
        })
    }

    async fn check_status(&self, merchant_order_id: &str) -> Result<StatusResult, BillingError> {
        let url = format!(
            "{}/api/merchant/transactionStatus",
            self.config.legacy_base_url
        );

        let body = TransactionStatusRequest {
            merchant_code: self.config.merchant_code.clone(),
            merchant_order_id: merchant_order_id.to_string(),
            signature: signature::status_signature(
                &self.config.merchant_code,
                merchant_order_id,
                self.config.api_key.expose_secret(),
            ),
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let http_status = response.status();
        if http_status.is_server_error() {
            return Err(BillingError::ProviderTransport(format!(
                "HTTP {}",
                http_status
            )));
        }
        if !http_status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BillingError::ProviderRejection {
                code: http_status.as_str().to_string(),
                message: text,
            });
        }

        let reply: TransactionStatusReply = response
            .json()
            .await
            .map_err(|e| BillingError::Parse(format!("invalid status reply: {}", e)))?;

        let status = match reply.status_code.as_str() {
            "00" => PaymentStatus::Paid,
            "01" => PaymentStatus::Pending,
            "02" => PaymentStatus::Canceled,
            other => PaymentStatus::Unknown(other.to_string()),
        };

        let amount = reply.amount.as_deref().and_then(parse_gateway_amount);

        Ok(StatusResult {
            merchant_order_id: reply
                .merchant_order_id
                .unwrap_or_else(|| merchant_order_id.to_string()),
            status,
            amount,
            provider_reference: reply.reference,
            status_message: reply.status_message,
        })
    }
}

/// Parses a gateway amount string. The gateway appends ".00" to whole
/// rupiah values.
fn parse_gateway_amount(raw: &str) -> Option<i64> {
    raw.strip_suffix(".00").unwrap_or(raw).parse().ok()
}

fn map_transport_error(err: reqwest::Error) -> BillingError {
    if err.is_timeout() {
        // The invoice may exist provider-side despite our timeout; recovery
        // is a status poll, not a blind retry.
        BillingError::ProviderTransport(format!("timeout: {}", err))
    } else {
        BillingError::ProviderTransport(err.to_string())
    }
}
