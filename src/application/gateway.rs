//! Payment gateway facade.
//!
//! Thin delegation layer over whichever `PaymentProvider` is configured.
//! Application code depends on this facade and the port, never on a concrete
//! gateway adapter, so swapping providers is a configuration change.

use std::sync::Arc;

use crate::adapters::duitku::{DuitkuConfig, DuitkuMode, DuitkuProvider, EndpointGeneration};
use crate::config::{PaymentConfig, PaymentEnvironment, ProviderKind};
use crate::domain::billing::{BillingError, CallbackPayload, VerificationResult};
use crate::ports::{InvoiceRequest, InvoiceResponse, PaymentProvider, StatusResult};

/// Provider-agnostic payment gateway.
#[derive(Clone)]
pub struct PaymentGateway {
    provider: Arc<dyn PaymentProvider>,
}

impl PaymentGateway {
    /// Wraps an already-constructed provider (tests inject mocks here).
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    /// Builds the configured provider and wraps it.
    pub fn from_config(config: &PaymentConfig) -> Result<Self, BillingError> {
        Ok(Self::new(build_provider(config)?))
    }

    pub async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResponse, BillingError> {
        self.provider.create_invoice(request).await
    }

    pub fn verify_callback(
        &self,
        payload: &CallbackPayload,
    ) -> Result<VerificationResult, BillingError> {
        self.provider.verify_callback(payload)
    }

    pub async fn check_status(
        &self,
        merchant_order_id: &str,
    ) -> Result<StatusResult, BillingError> {
        self.provider.check_status(merchant_order_id).await
    }
}

/// Constructs the provider named by configuration.
pub fn build_provider(config: &PaymentConfig) -> Result<Arc<dyn PaymentProvider>, BillingError> {
    match config.provider {
        ProviderKind::Duitku => {
            let mode = match config.environment {
                PaymentEnvironment::Sandbox => DuitkuMode::Sandbox,
                PaymentEnvironment::Production => DuitkuMode::Production,
            };
            let generation = if config.use_hosted_checkout {
                EndpointGeneration::HostedPage
            } else {
                EndpointGeneration::LegacyInquiry
            };

            let duitku_config = DuitkuConfig::new(
                config.merchant_code.clone(),
                config.api_key.clone(),
                mode,
                generation,
            )
            .with_timeout_secs(config.request_timeout_secs);

            Ok(Arc::new(DuitkuProvider::new(duitku_config)?))
        }
    }
}
