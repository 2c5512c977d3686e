//! HTTP adapter for the billing API.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, billing_routes};
