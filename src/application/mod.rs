//! Application layer: orchestration of the subscription payment flow.

mod gateway;
mod ledger;
mod orchestrator;

pub use gateway::{build_provider, PaymentGateway};
pub use ledger::{LedgerReceipt, SubscriptionLedger};
pub use orchestrator::{
    CallbackOutcome, CreateInvoiceCommand, InvoiceOutcome, InvoiceSettings, PaymentOrchestrator,
    SubscriptionInvoice,
};
