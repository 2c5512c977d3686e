//! In-memory adapters for tests and local development.

mod billing_store;
mod mock_payment_provider;

pub use billing_store::InMemoryBillingStore;
pub use mock_payment_provider::MockPaymentProvider;
