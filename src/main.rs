//! Kasir billing service entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use kasir_billing::adapters::http::billing::{billing_router, BillingAppState};
use kasir_billing::adapters::postgres::PostgresBillingStore;
use kasir_billing::application::{
    build_provider, InvoiceSettings, PaymentGateway, PaymentOrchestrator,
};
use kasir_billing::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        sandbox = config.payment.is_sandbox(),
        "Starting kasir-billing"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let provider = build_provider(&config.payment)?;
    let orchestrator = PaymentOrchestrator::new(
        PaymentGateway::new(provider),
        Arc::new(PostgresBillingStore::new(pool)),
        InvoiceSettings {
            callback_url: config.payment.callback_url.clone(),
            return_url: config.payment.return_url.clone(),
            expiry_minutes: config.payment.invoice_expiry_minutes,
        },
    );

    let state = BillingAppState {
        orchestrator: Arc::new(orchestrator),
    };

    let app = billing_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
