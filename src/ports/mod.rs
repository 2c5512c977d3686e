//! Ports: contracts between the application core and the outside world.

mod billing_store;
mod payment_provider;

pub use billing_store::{BillingStore, MarkOutcome, PaymentAttempt};
pub use payment_provider::{
    InvoiceRequest, InvoiceResponse, IssuedInvoice, PaymentProvider, PaymentStatus, StatusResult,
};
