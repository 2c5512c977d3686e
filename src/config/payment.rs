//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Which payment provider to construct at startup.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Duitku,
}

/// Which gateway environment invoices are created against. Fixed at startup;
/// there is no runtime switch between sandbox and production.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentEnvironment {
    #[default]
    Sandbox,
    Production,
}

/// Payment configuration (Duitku)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Provider selection
    #[serde(default)]
    pub provider: ProviderKind,

    /// Gateway environment
    #[serde(default)]
    pub environment: PaymentEnvironment,

    /// Merchant identifier issued by the gateway
    pub merchant_code: String,

    /// Merchant API key used for request signing
    pub api_key: String,

    /// Use the hosted-page invoice endpoint instead of the legacy inquiry
    #[serde(default)]
    pub use_hosted_checkout: bool,

    /// Public URL the gateway delivers payment callbacks to
    pub callback_url: String,

    /// URL customers land on after completing payment
    pub return_url: String,

    /// Invoice validity window in minutes
    #[serde(default = "default_invoice_expiry_minutes")]
    pub invoice_expiry_minutes: u32,

    /// Outbound gateway call timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.merchant_code.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__MERCHANT_CODE"));
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__API_KEY"));
        }
        if self.callback_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__CALLBACK_URL"));
        }
        if self.return_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__RETURN_URL"));
        }
        if !self.callback_url.starts_with("http://") && !self.callback_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidCallbackUrl);
        }
        if *environment == Environment::Production && !self.callback_url.starts_with("https://") {
            return Err(ValidationError::CallbackMustBeHttps);
        }
        // 7 days is the gateway's own upper bound for invoice validity.
        if self.invoice_expiry_minutes == 0 || self.invoice_expiry_minutes > 7 * 24 * 60 {
            return Err(ValidationError::InvalidInvoiceExpiry);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 30 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    /// Check if invoices are created against the sandbox
    pub fn is_sandbox(&self) -> bool {
        self.environment == PaymentEnvironment::Sandbox
    }

    /// Fixed configuration for unit tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            provider: ProviderKind::Duitku,
            environment: PaymentEnvironment::Sandbox,
            merchant_code: "D12345".to_string(),
            api_key: "test-api-key-12345".to_string(),
            use_hosted_checkout: false,
            callback_url: "https://kasir.test/api/billing/callback".to_string(),
            return_url: "https://kasir.test/billing/done".to_string(),
            invoice_expiry_minutes: default_invoice_expiry_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_invoice_expiry_minutes() -> u32 {
    1440
}

fn default_request_timeout_secs() -> u64 {
    8
}
