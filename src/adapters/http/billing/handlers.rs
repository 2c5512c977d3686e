//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the payment orchestrator. The
//! callback handler has its own acknowledgement policy: the gateway retries
//! on 5xx, so inauthentic callbacks are acknowledged with 200 after being
//! logged, and only transient server faults answer 5xx.

use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::duitku::DuitkuCallbackForm;
use crate::application::{CallbackOutcome, CreateInvoiceCommand, PaymentOrchestrator};
use crate::domain::billing::BillingError;

use super::dto::{
    CallbackAppliedResponse, CreateInvoiceRequest, CreateInvoiceResponse, ErrorResponse,
    TransactionStatusResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /invoices - create a subscription invoice for a tenant.
pub async fn create_invoice(
    State(state): State<BillingAppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Response {
    let command = CreateInvoiceCommand {
        tenant_slug: request.tenant_slug,
        plan_code: request.plan,
        email: request.email,
        phone_number: request.phone_number,
    };

    match state.orchestrator.create_subscription_invoice(command).await {
        Ok(outcome) => {
            let body = CreateInvoiceResponse::from(outcome);
            let status = match &body {
                CreateInvoiceResponse::Issued(_) => StatusCode::CREATED,
                CreateInvoiceResponse::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(body)).into_response()
        }
        Err(err) => api_error(err),
    }
}

/// POST /callback - payment notification from the gateway.
///
/// The response body is informational only; the gateway acts on the HTTP
/// status alone.
pub async fn handle_payment_callback(
    State(state): State<BillingAppState>,
    Form(form): Form<DuitkuCallbackForm>,
) -> Response {
    let payload = form.into();

    match state.orchestrator.process_callback(&payload).await {
        Ok(CallbackOutcome::Applied(receipt)) => {
            (StatusCode::OK, Json(CallbackAppliedResponse::from(receipt))).into_response()
        }
        Ok(CallbackOutcome::NotYetPaid {
            merchant_order_id,
            result_code,
        }) => {
            tracing::info!(
                merchant_order_id = %merchant_order_id,
                result_code = %result_code,
                "Acknowledged non-success callback"
            );
            StatusCode::OK.into_response()
        }
        Err(err) => {
            if err.is_security_event() {
                tracing::warn!(error = %err, "Rejected callback, security event");
            } else {
                tracing::error!(error = %err, "Callback processing failed");
            }
            err.callback_ack_status().into_response()
        }
    }
}

/// GET /status/:merchant_order_id - query the provider for an order's state.
pub async fn get_transaction_status(
    State(state): State<BillingAppState>,
    Path(merchant_order_id): Path<String>,
) -> Response {
    match state.orchestrator.check_status(&merchant_order_id).await {
        Ok(result) => {
            (StatusCode::OK, Json(TransactionStatusResponse::from(result))).into_response()
        }
        Err(err) => api_error(err),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════════

/// Maps a billing error onto the API's error response shape. Only used by
/// client-facing endpoints; the callback endpoint has its own policy.
fn api_error(err: BillingError) -> Response {
    let (status, code) = match &err {
        BillingError::TenantNotFound(_) => (StatusCode::NOT_FOUND, "TENANT_NOT_FOUND"),
        BillingError::OrderIdFormat(_) => (StatusCode::BAD_REQUEST, "INVALID_ORDER_ID"),
        BillingError::Parse(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        BillingError::ProviderRejection { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "PROVIDER_REJECTED")
        }
        BillingError::ProviderTransport(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE"),
        BillingError::InvalidMerchantCode
        | BillingError::InvalidSignature
        | BillingError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, "VERIFICATION_FAILED"),
        BillingError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }

    (status, Json(ErrorResponse::new(code, err.to_string()))).into_response()
}
