//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_invoice, get_transaction_status, handle_payment_callback, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## Client Endpoints
/// - `POST /invoices` - Create a subscription invoice for a tenant
/// - `GET /status/:merchant_order_id` - Query provider for order status
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /callback` - Handle gateway payment callbacks
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/status/:merchant_order_id", get(get_transaction_status))
        .route("/callback", post(handle_payment_callback))
}

/// Create the complete billing module router, mounted at `/api/billing`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new().nest("/api/billing", billing_routes())
}
