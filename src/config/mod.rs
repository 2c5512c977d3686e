//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the `KASIR_`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use kasir_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, PaymentEnvironment, ProviderKind};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Duitku)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads variables with the `KASIR` prefix
    /// using `__` to separate nested values:
    ///
    /// - `KASIR__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `KASIR__PAYMENT__MERCHANT_CODE=D12345` -> `payment.merchant_code`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("KASIR").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(&self.server.environment)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("KASIR__DATABASE__URL", "postgresql://test@localhost/kasir");
        env::set_var("KASIR__PAYMENT__MERCHANT_CODE", "D12345");
        env::set_var("KASIR__PAYMENT__API_KEY", "test-api-key");
        env::set_var(
            "KASIR__PAYMENT__CALLBACK_URL",
            "https://kasir.test/api/billing/callback",
        );
        env::set_var("KASIR__PAYMENT__RETURN_URL", "https://kasir.test/billing/done");
    }

    fn clear_env() {
        env::remove_var("KASIR__DATABASE__URL");
        env::remove_var("KASIR__PAYMENT__MERCHANT_CODE");
        env::remove_var("KASIR__PAYMENT__API_KEY");
        env::remove_var("KASIR__PAYMENT__CALLBACK_URL");
        env::remove_var("KASIR__PAYMENT__RETURN_URL");
        env::remove_var("KASIR__SERVER__PORT");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.payment.merchant_code, "D12345");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_required_values_fail_loading() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
